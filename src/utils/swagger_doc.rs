use crate::utils::error::AppError;
use rocket_okapi::okapi::openapi3::{Response, Responses, MediaType};
use rocket_okapi::response::OpenApiResponderInner;
use rocket_okapi::gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::RefOr;
use okapi::openapi3::SchemaObject;
use indexmap::IndexMap;
use serde_json::json;

impl<'r> OpenApiResponderInner for AppError {
    fn responses(_gen: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        let mut responses = Responses::default();

        // One documented example per status code the handlers can produce
        let error_responses = [
            ("Bad Request", AppError::InvalidInput("seats should be a positive integer".to_string())),
            ("Unauthorized", AppError::AuthError("Invalid credentials".to_string())),
            ("Not Found", AppError::ShowtimeNotFound("3f2b6c1e-0000-0000-0000-000000000000".to_string())),
            ("Conflict", AppError::InsufficientSeats { requested: 3, available: 2 }),
            ("Internal Server Error", AppError::BookkeepingFault("release would exceed capacity".to_string())),
            ("Service Unavailable", AppError::StorageUnavailable("pool timed out".to_string())),
        ];

        for (description, error) in error_responses {
            responses.responses.insert(
                error.status().code.to_string(),
                RefOr::Object(Response {
                    description: description.to_string(),
                    content: {
                        let mut content = IndexMap::new();
                        content.insert(
                            "application/json".to_string(),
                            MediaType {
                                schema: Some(SchemaObject::default()),
                                example: Some(json!({
                                    "error": error.to_string()
                                })),
                                ..Default::default()
                            },
                        );
                        content
                    },
                    ..Default::default()
                }),
            );
        }

        Ok(responses)
    }
}
