//! Request extractors that report bad input as a [PaddyError].
//!
//! axum's own extractors reject with plain-text bodies; these wrap them so
//! every failure reaches the client as the usual JSON error.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::body::{Body, HttpBody};
use axum::extract::{FromRequest, Multipart, Path, Query, RequestParts};
use axum::http::header::CONTENT_TYPE;
use axum::{BoxError, Json};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::PaddyError;
use crate::models::roster::ClassUpload;
use crate::util::decode_file;

/// A JSON request body.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, B> FromRequest<B> for JsonBody<T>
where
    T: DeserializeOwned,
    B: HttpBody + Send,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Rejection = PaddyError;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req)
            .await
            .map(|Json(value)| JsonBody(value))
            .map_err(|rejection| PaddyError::InvalidInput(rejection.to_string()))
    }
}

/// Query string parameters.
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<T, B> FromRequest<B> for QueryParams<T>
where
    T: DeserializeOwned,
    B: Send,
{
    type Rejection = PaddyError;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request(req)
            .await
            .map(|Query(value)| QueryParams(value))
            .map_err(|rejection| PaddyError::InvalidInput(rejection.to_string()))
    }
}

/// A single path parameter, e.g. the class ID in `/detailView/:classID`.
pub struct PathParam<T>(pub T);

#[async_trait]
impl<T, B> FromRequest<B> for PathParam<T>
where
    T: DeserializeOwned + Send,
    B: Send,
{
    type Rejection = PaddyError;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        Path::<T>::from_request(req)
            .await
            .map(|Path(value)| PathParam(value))
            .map_err(|rejection| PaddyError::InvalidInput(rejection.to_string()))
    }
}

/// A roster upload sent as JSON, with the CSV base64-encoded in `file`.
#[derive(Deserialize)]
struct ClassUploadJson {
    #[serde(rename = "ClassID")]
    class_id: Option<i64>,
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Subject")]
    subject: Option<String>,
    #[serde(rename = "Section")]
    section: Option<String>,
    #[serde(rename = "submissionDeadline")]
    submission_deadline: Option<String>,
    file: Option<String>,
}

/// A new class and its roster, from either a multipart form or a JSON body.
pub struct ClassUploadBody(pub ClassUpload);

#[async_trait]
impl FromRequest<Body> for ClassUploadBody {
    type Rejection = PaddyError;

    async fn from_request(req: &mut RequestParts<Body>) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.starts_with("multipart/form-data"))
            .unwrap_or(false);

        let upload = if is_multipart {
            from_multipart(req).await?
        } else {
            let JsonBody(body) = JsonBody::<ClassUploadJson>::from_request(req).await?;
            let roster = body
                .file
                .map(|file| decode_file(&file).map_err(PaddyError::InvalidInput))
                .transpose()?;

            ClassUpload::from_fields(
                body.class_id.map(|id| id.to_string()),
                body.name,
                body.subject,
                body.section,
                body.submission_deadline,
                roster,
            )?
        };

        Ok(ClassUploadBody(upload))
    }
}

async fn from_multipart(req: &mut RequestParts<Body>) -> Result<ClassUpload, PaddyError> {
    let mut multipart = Multipart::from_request(req)
        .await
        .map_err(|rejection| PaddyError::InvalidInput(rejection.to_string()))?;
    let bad_form = |err: axum::extract::multipart::MultipartError| {
        PaddyError::InvalidInput(format!("couldn't read the upload form: {}", err))
    };

    let mut fields = HashMap::new();
    let mut roster = None;
    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let name = field.name().unwrap_or_default().to_owned();
        let contents = field.bytes().await.map_err(bad_form)?;

        if name == "file" {
            roster = Some(contents.to_vec());
        } else {
            fields.insert(name, String::from_utf8_lossy(&contents).into_owned());
        }
    }

    ClassUpload::from_fields(
        fields.remove("ClassID"),
        fields.remove("Name"),
        fields.remove("Subject"),
        fields.remove("Section"),
        fields.remove("submissionDeadline"),
        roster,
    )
}
