//! Infrastructure services

mod iam_service;

pub use iam_service::IamService;
