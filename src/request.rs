// Outbound application submission
use crate::models::JobId;
use crate::xml_mapper::MappingError;
use serde::Serialize;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// One answer to a question of a blank application.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Response {
    pub question_id: String,
    pub response_text: String,
}

impl Response {
    pub fn new(question_id: impl Into<String>, response_text: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            response_text: response_text.into(),
        }
    }
}

/// An application ready to be submitted. `test` left unset falls back to the
/// client's configured test mode.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestApplication {
    pub job_id: String,
    pub test: Option<bool>,
    pub responses: Vec<Response>,
}

impl RequestApplication {
    pub fn new<J: JobId + ?Sized>(job: &J) -> Self {
        Self {
            job_id: job.job_id().to_string(),
            ..Default::default()
        }
    }

    pub fn with_test(mut self, test: bool) -> Self {
        self.test = Some(test);
        self
    }

    pub fn with_response(
        mut self,
        question_id: impl Into<String>,
        response_text: impl Into<String>,
    ) -> Self {
        self.responses.push(Response::new(question_id, response_text));
        self
    }

    /// Serialize the submission body, embedding the developer key.
    pub fn to_xml(&self, developer_key: &str, default_test: bool) -> Result<String, MappingError> {
        let payload = XmlRequestApplication {
            developer_key,
            job_did: &self.job_id,
            test: if self.test.unwrap_or(default_test) {
                "True"
            } else {
                "False"
            },
            responses: XmlResponses {
                responses: self
                    .responses
                    .iter()
                    .map(|r| XmlResponse {
                        question_id: &r.question_id,
                        response_text: &r.response_text,
                    })
                    .collect(),
            },
        };

        let body = quick_xml::se::to_string(&payload)
            .map_err(|e| MappingError::ConversionError(e.to_string()))?;
        Ok(format!("{}{}", XML_DECLARATION, body))
    }
}

// Structures for XML serialization
#[derive(Debug, Serialize)]
#[serde(rename = "RequestApplication", rename_all = "PascalCase")]
struct XmlRequestApplication<'a> {
    developer_key: &'a str,
    #[serde(rename = "JobDID")]
    job_did: &'a str,
    test: &'static str,
    responses: XmlResponses<'a>,
}

#[derive(Debug, Serialize)]
struct XmlResponses<'a> {
    #[serde(rename = "Response")]
    responses: Vec<XmlResponse<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct XmlResponse<'a> {
    #[serde(rename = "QuestionID")]
    question_id: &'a str,
    response_text: &'a str,
}
