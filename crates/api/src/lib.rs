#![doc = include_str!("../README.md")]

// Generated code
pub mod pkgscan {
    pub mod v1 {
        tonic::include_proto!("pkgscan.v1");
    }
}

pub use pkgscan::v1::package_scanner_client::PackageScannerClient;
pub use pkgscan::v1::package_scanner_server::{PackageScanner, PackageScannerServer};
pub use pkgscan::v1::{SbomRequest, SbomResult};
