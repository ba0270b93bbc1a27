/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

//! Values returned by method handlers.

use serde_json::Value;

/// What a method handler produces.
///
/// Handlers either return plain text or a rich reply carrying any of text, HTML and
/// structured data. Both forms map onto an answer the same way: text becomes the
/// answer text, HTML and data are carried as-is.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// A plain text result.
    Text(String),
    /// A result with optional text, HTML and data parts.
    Rich {
        /// Answer text.
        text: Option<String>,
        /// HTML rendering of the answer.
        html: Option<String>,
        /// Structured answer data.
        data: Option<Value>,
    },
}

impl Reply {
    /// A plain text reply.
    #[inline]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// A reply with text and its HTML rendering.
    #[inline]
    pub fn html(text: impl Into<String>, html: impl Into<String>) -> Self {
        Self::Rich {
            text: Some(text.into()),
            html: Some(html.into()),
            data: None,
        }
    }

    /// A reply with text and structured data.
    #[inline]
    pub fn data(text: impl Into<String>, data: Value) -> Self {
        Self::Rich {
            text: Some(text.into()),
            html: None,
            data: Some(data),
        }
    }

    /// Splits the reply into answer text, HTML and data.
    #[must_use]
    pub fn into_parts(self) -> (String, Option<String>, Option<Value>) {
        match self {
            Self::Text(text) => (text, None, None),
            Self::Rich { text, html, data } => (text.unwrap_or_default(), html, data),
        }
    }
}

impl Default for Reply {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Objects are read for `text`, `html` and `data` keys; strings become text; any other
/// value is carried as data.
impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            Value::Object(mut map) => {
                let take_string = |v: Option<Value>| match v {
                    Some(Value::String(s)) => Some(s),
                    Some(Value::Null) | None => None,
                    Some(other) => Some(other.to_string()),
                };
                let text = take_string(map.remove("text"));
                let html = take_string(map.remove("html"));
                let data = map.remove("data").filter(|d| !d.is_null());
                Self::Rich { text, html, data }
            }
            other => Self::Rich {
                text: None,
                html: None,
                data: Some(other),
            },
        }
    }
}
