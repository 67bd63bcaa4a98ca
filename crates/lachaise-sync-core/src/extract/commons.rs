//! Media-repository image info.

use serde_json::Value;

use crate::error::{FieldError, FieldResult};
use crate::path;

use super::json::{array_at, str_at};

fn single_image_info(page: &Value) -> FieldResult<&Value> {
    let info = array_at(page, path!["imageinfo"])?;
    match info.as_slice() {
        [one] => Ok(one),
        _ => Err(FieldError::Ambiguous {
            path: "imageinfo".into(),
            count: info.len(),
        }),
    }
}

pub fn original_url(page: &Value) -> FieldResult<String> {
    str_at(single_image_info(page)?, path!["url"]).map(str::to_string)
}

/// URL of the thumbnail rendered at the requested `iiurlwidth`.
pub fn thumbnail_url(page: &Value) -> FieldResult<String> {
    str_at(single_image_info(page)?, path!["thumburl"]).map(str::to_string)
}
