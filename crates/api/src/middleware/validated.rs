//! JSON body extractor that runs `validator` rules before the handler.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;
use boxoffice_core::error::CoreError;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::error::AppError;

/// Drop-in replacement for `Json<T>` that also calls [`Validate::validate`].
///
/// Malformed JSON is a 400 `BAD_REQUEST`; rule violations are a 400
/// `VALIDATION_ERROR` listing every failing field.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| AppError::BadRequest(rejection.body_text()))?;

        value
            .validate()
            .map_err(|errors| AppError::Core(CoreError::Validation(describe(&errors))))?;

        Ok(ValidatedJson(value))
    }
}

/// Flatten field errors into `field: message` pairs, sorted by field.
fn describe(errors: &ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(msg) => format!("{field}: {msg}"),
                None => format!("{field}: invalid value ({})", e.code),
            })
        })
        .collect();
    parts.sort();
    parts.join("; ")
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use validator::Validate;

    use super::*;

    #[derive(Debug, Deserialize, Validate)]
    struct Probe {
        #[validate(range(min = 1, message = "must be positive"))]
        count: i32,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn describes_every_failing_field() {
        let probe = Probe {
            count: 0,
            email: "nope".into(),
        };
        let msg = describe(&probe.validate().unwrap_err());
        assert_eq!(msg, "count: must be positive; email: invalid value (email)");
    }
}
