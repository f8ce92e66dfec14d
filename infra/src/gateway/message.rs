//! SMS text sent with an OTP

/// Fill the patient name and lifetime into an SMS template
///
/// `{otp}` is left in place; the gateway generates the code and substitutes
/// it before sending.
pub fn render_message(template: &str, patient_name: &str, expiry_minutes: f64) -> String {
    let name = patient_name.trim();
    let name = if name.is_empty() { "Patient" } else { name };

    template
        .replace("{patient_name}", name)
        .replace("{expiry_minutes}", &expiry_minutes.to_string())
}
