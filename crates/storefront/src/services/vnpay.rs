//! VNPay return URL handling.
//!
//! After paying, VNPay redirects the customer back with `vnp_*` query
//! parameters. When the merchant hash secret is configured the parameters
//! are checked against `vnp_SecureHash` before anything is shown.
//!
//! The signed string is every non-empty `vnp_*` parameter except the hash
//! fields, sorted by name, form-encoded and joined with `&`. The hash is
//! HMAC-SHA512 of that string, hex encoded.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha512;
use sgshop_core::{Money, OrderId};
use thiserror::Error;

type HmacSha512 = Hmac<Sha512>;

const SECURE_HASH: &str = "vnp_SecureHash";
const SECURE_HASH_TYPE: &str = "vnp_SecureHashType";

/// Errors that can occur when reading a VNPay return.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VnpayError {
    #[error("missing parameter {0}")]
    Missing(&'static str),
    #[error("invalid parameter {0}")]
    Invalid(&'static str),
    #[error("secure hash does not match")]
    SignatureMismatch,
}

/// The parts of a VNPay return the storefront shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VnpayReturn {
    /// `vnp_TxnRef`: the order id the payment URL was issued for.
    pub txn_ref: String,
    pub amount: Money,
    pub response_code: String,
    pub transaction_status: Option<String>,
    pub transaction_no: Option<String>,
    pub bank_code: Option<String>,
    pub pay_date: Option<String>,
    pub order_info: Option<String>,
}

impl VnpayReturn {
    /// Parse the return parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if `vnp_TxnRef` or `vnp_ResponseCode` is missing or
    /// `vnp_Amount` is not a number.
    pub fn from_params(params: &BTreeMap<String, String>) -> Result<Self, VnpayError> {
        let get = |key: &str| {
            params
                .get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let txn_ref = get("vnp_TxnRef").ok_or(VnpayError::Missing("vnp_TxnRef"))?;
        let response_code = get("vnp_ResponseCode").ok_or(VnpayError::Missing("vnp_ResponseCode"))?;
        // VNPay sends amounts multiplied by 100
        let amount = match get("vnp_Amount") {
            Some(raw) => raw
                .parse::<i64>()
                .map(|v| Money::from_dong(v / 100))
                .map_err(|_| VnpayError::Invalid("vnp_Amount"))?,
            None => Money::ZERO,
        };

        Ok(Self {
            txn_ref,
            amount,
            response_code,
            transaction_status: get("vnp_TransactionStatus"),
            transaction_no: get("vnp_TransactionNo"),
            bank_code: get("vnp_BankCode"),
            pay_date: get("vnp_PayDate"),
            order_info: get("vnp_OrderInfo"),
        })
    }

    /// Paid iff the response code is `00` and, when present, so is the
    /// transaction status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.response_code == "00"
            && self
                .transaction_status
                .as_deref()
                .is_none_or(|status| status == "00")
    }

    /// Order id, when the reference is numeric.
    #[must_use]
    pub fn order_id(&self) -> Option<OrderId> {
        self.txn_ref.parse().ok()
    }

    /// Message for the result page.
    #[must_use]
    pub fn message(&self) -> &'static str {
        if self.is_success() {
            return response_message("00");
        }
        match self.transaction_status.as_deref() {
            Some(status) if self.response_code == "00" && status != "00" => {
                "Giao dịch chưa hoàn tất. Vui lòng kiểm tra lại sau."
            }
            _ => response_message(&self.response_code),
        }
    }
}

/// Keep only `vnp_*` parameters.
#[must_use]
pub fn vnp_params<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> BTreeMap<String, String> {
    pairs
        .into_iter()
        .filter(|(k, _)| k.starts_with("vnp_"))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// The string VNPay signs.
#[must_use]
pub fn signing_data(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .filter(|(k, v)| k.as_str() != SECURE_HASH && k.as_str() != SECURE_HASH_TYPE && !v.is_empty())
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Hex HMAC-SHA512 of `data`.
fn sign(secret: &SecretString, data: &str) -> String {
    // HMAC accepts keys of any length
    let Ok(mut mac) = HmacSha512::new_from_slice(secret.expose_secret().as_bytes()) else {
        return String::new();
    };
    mac.update(data.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Check `vnp_SecureHash` against the other parameters.
///
/// # Errors
///
/// Returns an error if the hash is missing or does not match.
pub fn verify(params: &BTreeMap<String, String>, secret: &SecretString) -> Result<(), VnpayError> {
    let provided = params
        .get(SECURE_HASH)
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
        .ok_or(VnpayError::Missing(SECURE_HASH))?;

    let expected = sign(secret, &signing_data(params));
    if !expected.is_empty() && constant_time_eq(expected.as_bytes(), provided.as_bytes()) {
        Ok(())
    } else {
        Err(VnpayError::SignatureMismatch)
    }
}

/// Constant-time comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Customer-facing text for a `vnp_ResponseCode`.
#[must_use]
pub fn response_message(code: &str) -> &'static str {
    match code {
        "00" => "Giao dịch thành công",
        "07" => "Trừ tiền thành công. Giao dịch bị nghi ngờ (liên quan tới lừa đảo, giao dịch bất thường).",
        "09" => "Thẻ/Tài khoản của khách hàng chưa đăng ký dịch vụ InternetBanking tại ngân hàng.",
        "10" => "Khách hàng xác thực thông tin thẻ/tài khoản không đúng quá 3 lần.",
        "11" => "Đã hết hạn chờ thanh toán. Xin quý khách vui lòng thực hiện lại giao dịch.",
        "12" => "Thẻ/Tài khoản của khách hàng bị khóa.",
        "13" => "Quý khách nhập sai mật khẩu xác thực giao dịch (OTP).",
        "24" => "Khách hàng hủy giao dịch.",
        "51" => "Tài khoản của quý khách không đủ số dư để thực hiện giao dịch.",
        "65" => "Tài khoản của quý khách đã vượt quá hạn mức giao dịch trong ngày.",
        "75" => "Ngân hàng thanh toán đang bảo trì.",
        "79" => "Quý khách nhập sai mật khẩu thanh toán quá số lần quy định.",
        _ => "Giao dịch thất bại. Vui lòng thử lại hoặc chọn phương thức thanh toán khác.",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn secret() -> SecretString {
        SecretString::from("K7QW2ZP9XMBN4RT8VCLD3YHGF6SJA1EU")
    }

    fn params() -> BTreeMap<String, String> {
        vnp_params([
            ("vnp_Amount", "15000000"),
            ("vnp_BankCode", "NCB"),
            ("vnp_OrderInfo", "Thanh toan don hang 42"),
            ("vnp_ResponseCode", "00"),
            ("vnp_TransactionStatus", "00"),
            ("vnp_TxnRef", "42"),
            ("vnp_PayDate", ""),
            ("utm_source", "email"),
        ])
    }

    fn signed() -> BTreeMap<String, String> {
        let mut p = params();
        let hash = sign(&secret(), &signing_data(&p));
        p.insert(SECURE_HASH.to_string(), hash.to_uppercase());
        p.insert(SECURE_HASH_TYPE.to_string(), "HmacSHA512".to_string());
        p
    }

    #[test]
    fn test_signing_data_sorted_encoded_without_empty_values() {
        let data = signing_data(&params());
        assert_eq!(
            data,
            "vnp_Amount=15000000&vnp_BankCode=NCB&vnp_OrderInfo=Thanh+toan+don+hang+42\
             &vnp_ResponseCode=00&vnp_TransactionStatus=00&vnp_TxnRef=42"
        );
    }

    #[test]
    fn test_verify_accepts_valid_hash_in_any_case() {
        assert_eq!(verify(&signed(), &secret()), Ok(()));
    }

    #[test]
    fn test_verify_rejects_tampering() {
        let mut p = signed();
        p.insert("vnp_Amount".to_string(), "100".to_string());
        assert_eq!(verify(&p, &secret()), Err(VnpayError::SignatureMismatch));

        let mut missing = params();
        missing.remove(SECURE_HASH);
        assert_eq!(verify(&missing, &secret()), Err(VnpayError::Missing(SECURE_HASH)));
    }

    #[test]
    fn test_parse_return() {
        let ret = VnpayReturn::from_params(&signed()).unwrap();
        assert_eq!(ret.amount, Money::from_dong(150_000));
        assert_eq!(ret.order_id(), Some(OrderId::new(42)));
        assert_eq!(ret.pay_date, None);
        assert!(ret.is_success());
        assert_eq!(ret.message(), "Giao dịch thành công");
    }

    #[test]
    fn test_failure_codes() {
        let mut p = params();
        p.insert("vnp_ResponseCode".to_string(), "24".to_string());
        p.insert("vnp_TransactionStatus".to_string(), "02".to_string());
        let ret = VnpayReturn::from_params(&p).unwrap();
        assert!(!ret.is_success());
        assert_eq!(ret.message(), "Khách hàng hủy giao dịch.");

        let mut pending = params();
        pending.insert("vnp_TransactionStatus".to_string(), "01".to_string());
        let ret = VnpayReturn::from_params(&pending).unwrap();
        assert!(!ret.is_success());

        let mut no_status = params();
        no_status.remove("vnp_TransactionStatus");
        assert!(VnpayReturn::from_params(&no_status).unwrap().is_success());
    }

    #[test]
    fn test_missing_and_invalid_params() {
        let mut p = params();
        p.remove("vnp_TxnRef");
        assert_eq!(VnpayReturn::from_params(&p), Err(VnpayError::Missing("vnp_TxnRef")));

        let mut bad = params();
        bad.insert("vnp_Amount".to_string(), "abc".to_string());
        assert_eq!(VnpayReturn::from_params(&bad), Err(VnpayError::Invalid("vnp_Amount")));
    }

    #[test]
    fn test_unknown_code_message() {
        assert!(response_message("42").starts_with("Giao dịch thất bại"));
    }
}
