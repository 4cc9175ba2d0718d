//! Which roles may call which catalog method
//!
//! Login and SearchRecords have no entry and are public.

use crate::grpc::methods;
use grpc_jwt_propagation::AccessPolicy;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

pub fn catalog_policy() -> AccessPolicy {
    AccessPolicy::new()
        .allow(methods::CREATE_RECORD, [ROLE_ADMIN])
        .allow(methods::UPLOAD_IMAGE, [ROLE_ADMIN])
        .allow(methods::RATE_RECORDS, [ROLE_ADMIN, ROLE_USER])
}
