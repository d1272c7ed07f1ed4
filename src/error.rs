use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::store::StoreError;

pub const INCORRECT_PASSWORD: &str = "Incorrect password supplied for deletion.";

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Board requested is invalid.")] InvalidBoard,
    #[error("The thread or reply could not be found, please check the id and try again.")] NotFound,
    #[error("{}", INCORRECT_PASSWORD)] Unauthorized,
    #[error("{0}")] BadRequest(&'static str),
    #[error("Sorry, the message board is temporarily unavailable. Please try again.")] Unavailable,
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidBoard(_) => ApiError::InvalidBoard,
            StoreError::NotFound => ApiError::NotFound,
            StoreError::Unauthorized => ApiError::Unauthorized,
            StoreError::Validation(reason) => ApiError::BadRequest(reason),
            StoreError::StorageUnavailable(reason) => {
                log::error!("storage unavailable: {reason}");
                ApiError::Unavailable
            }
        }
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;
        let status = match self {
            ApiError::InvalidBoard | ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        };
        HttpResponse::build(status).json(ApiErrorBody { error: self.to_string() })
    }
}
