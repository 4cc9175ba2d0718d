// Build script for catalog-service
// Generates tonic server and client code for AuthService and RecordService.
// Messages are hand-written prost types in src/grpc/mod.rs, so no protoc is needed.
use tonic_build::manual::{Builder, Method, Service};

const CODEC: &str = "tonic::codec::ProstCodec";

fn method(name: &str, route: &str, input: &str, output: &str) -> tonic_build::manual::MethodBuilder {
    Method::builder()
        .name(name)
        .route_name(route)
        .input_type(format!("crate::grpc::{}", input))
        .output_type(format!("crate::grpc::{}", output))
        .codec_path(CODEC)
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let auth = Service::builder()
        .name("AuthService")
        .package("catalog.v1")
        .method(method("login", "Login", "LoginRequest", "LoginResponse").build())
        .build();

    let records = Service::builder()
        .name("RecordService")
        .package("catalog.v1")
        .method(
            method(
                "create_record",
                "CreateRecord",
                "CreateRecordRequest",
                "CreateRecordResponse",
            )
            .build(),
        )
        .method(
            method(
                "search_records",
                "SearchRecords",
                "SearchRecordsRequest",
                "SearchRecordsResponse",
            )
            .server_streaming()
            .build(),
        )
        .method(
            method(
                "rate_records",
                "RateRecords",
                "RateRecordRequest",
                "RateRecordResponse",
            )
            .client_streaming()
            .server_streaming()
            .build(),
        )
        .method(
            method(
                "upload_image",
                "UploadImage",
                "UploadImageRequest",
                "UploadImageResponse",
            )
            .client_streaming()
            .build(),
        )
        .build();

    Builder::new().compile(&[auth, records]);
}
