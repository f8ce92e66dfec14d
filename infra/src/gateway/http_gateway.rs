//! HTTP implementation of the OTP gateway
//!
//! Talks to the OTP-issuing service over two REST calls:
//!
//! - `POST {base}/send-otp?message=..&phone=..[&nationalId=..]`
//! - `POST {base}/validate-otp` with body `{"id": .., "otp": ..}`
//!
//! Every request is bounded by the configured timeout. No call is retried
//! here; resending is a caller decision.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use sv_core::errors::{VerificationError, VerificationResult};
use sv_core::services::verification::{IssueOtpRequest, IssuedOtp, OtpGateway};
use sv_shared::config::GatewayConfig;
use sv_shared::phone::mask_phone_number;

use crate::InfrastructureError;

use super::message::render_message;
use super::response::{error_message, parse_issue_response, parse_validate_response};

#[derive(Serialize, Debug)]
struct ValidateOtpBody<'a> {
    id: &'a str,
    otp: &'a str,
}

/// OTP gateway reached over HTTP
pub struct HttpOtpGateway {
    http_client: Client,
    config: GatewayConfig,
}

impl HttpOtpGateway {
    /// Build the gateway with a client bounded by the configured timeout
    pub fn new(config: GatewayConfig) -> Result<Self, InfrastructureError> {
        let http_client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        tracing::info!(
            send_url = %config.send_otp_url(),
            validate_url = %config.validate_otp_url(),
            timeout_secs = config.request_timeout_secs,
            "HTTP OTP gateway initialized"
        );

        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Send a request and return the body of a 2xx response
    async fn send(&self, request: reqwest::RequestBuilder) -> VerificationResult<String> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(VerificationError::gateway_status(
                status.as_u16(),
                error_message(&body),
            ));
        }
        Ok(body)
    }

    fn transport_error(&self, error: reqwest::Error) -> VerificationError {
        if error.is_timeout() {
            VerificationError::gateway(format!(
                "OTP gateway request timed out after {}s",
                self.config.request_timeout_secs
            ))
        } else if error.is_connect() {
            VerificationError::gateway(format!("OTP gateway unreachable: {}", error))
        } else {
            VerificationError::gateway(format!("OTP gateway request failed: {}", error))
        }
    }
}

#[async_trait]
impl OtpGateway for HttpOtpGateway {
    #[tracing::instrument(name = "Issuing OTP", skip_all)]
    async fn issue_otp(&self, request: &IssueOtpRequest) -> VerificationResult<IssuedOtp> {
        let message = render_message(
            &self.config.message_template,
            &request.patient_name,
            request.expiry_minutes,
        );

        let mut query = vec![
            ("message", message.as_str()),
            ("phone", request.phone_number.as_str()),
        ];
        if let Some(national_id) = request.national_id.as_deref() {
            query.push(("nationalId", national_id));
        }

        let body = self
            .send(
                self.http_client
                    .post(self.config.send_otp_url())
                    .query(&query),
            )
            .await
            .map_err(|e| {
                tracing::warn!(
                    phone = %mask_phone_number(&request.phone_number),
                    error = %e,
                    event = "gateway_issue_failed",
                    "OTP gateway rejected the issue request"
                );
                e
            })?;

        let issued = parse_issue_response(&body)?;
        tracing::debug!(
            phone = %mask_phone_number(&request.phone_number),
            external_otp_id = %issued.external_otp_id,
            event = "gateway_otp_issued",
            "OTP gateway issued an OTP"
        );
        Ok(issued)
    }

    #[tracing::instrument(name = "Validating OTP", skip_all)]
    async fn validate_otp(&self, external_otp_id: &str, code: &str) -> VerificationResult<bool> {
        let body = self
            .send(
                self.http_client
                    .post(self.config.validate_otp_url())
                    .json(&ValidateOtpBody {
                        id: external_otp_id,
                        otp: code,
                    }),
            )
            .await?;

        parse_validate_response(&body)
    }
}
