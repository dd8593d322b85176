//! PayHere hosted checkout: request signing, notification verification and the redirect
//! payload posted to the hosted payment page.

use std::fmt;

use anyhow::{Context, Result};
use chrono::Utc;
use md5::{Digest, Md5};
use mockall::automock;
use rand::Rng;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::value_objects::payments::PayHereNotification;

pub const SANDBOX_CHECKOUT_URL: &str = "https://sandbox.payhere.lk/pay/checkout";
pub const DEFAULT_CURRENCY: &str = "LKR";
pub const DEFAULT_ORDER_PREFIX: &str = "TO";

const ORDER_SUFFIX_LEN: usize = 6;
const ORDER_SUFFIX_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Clone)]
pub struct PayHereSettings {
    pub merchant_id: String,
    pub merchant_secret: String,
    pub checkout_url: Url,
    pub currency: String,
    pub order_prefix: String,
    /// Site origin for the customer-facing return and cancel pages.
    pub public_base_url: Url,
    /// Origin PayHere calls back for the server-to-server notification.
    pub api_base_url: Url,
}

impl fmt::Debug for PayHereSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayHereSettings")
            .field("merchant_id", &self.merchant_id)
            .field("merchant_secret", &"<redacted>")
            .field("checkout_url", &self.checkout_url.as_str())
            .field("currency", &self.currency)
            .field("order_prefix", &self.order_prefix)
            .field("public_base_url", &self.public_base_url.as_str())
            .field("api_base_url", &self.api_base_url.as_str())
            .finish()
    }
}

fn md5_upper_hex(input: &str) -> String {
    hex::encode_upper(Md5::digest(input.as_bytes()))
}

/// Fixed-point amount with exactly two decimals, halves rounded away from zero.
pub fn format_amount(amount: Decimal) -> String {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.to_string()
}

#[derive(Clone)]
pub struct PayHereSigner {
    merchant_id: String,
    secret_hash: String,
}

impl fmt::Debug for PayHereSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayHereSigner")
            .field("merchant_id", &self.merchant_id)
            .finish_non_exhaustive()
    }
}

impl PayHereSigner {
    pub fn new(merchant_id: impl Into<String>, merchant_secret: &str) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            secret_hash: md5_upper_hex(merchant_secret),
        }
    }

    pub fn merchant_id(&self) -> &str {
        &self.merchant_id
    }

    /// `upper(md5(merchant_id + order_id + amount + currency + upper(md5(secret))))`
    pub fn compute_create_hash(&self, order_id: &str, amount: Decimal, currency: &str) -> String {
        md5_upper_hex(&format!(
            "{}{}{}{}{}",
            self.merchant_id,
            order_id,
            format_amount(amount),
            currency,
            self.secret_hash
        ))
    }

    /// Same as the create hash with `status_code` placed before the secret term.
    pub fn compute_notify_hash(
        &self,
        order_id: &str,
        amount: Decimal,
        currency: &str,
        status_code: &str,
    ) -> String {
        md5_upper_hex(&format!(
            "{}{}{}{}{}{}",
            self.merchant_id,
            order_id,
            format_amount(amount),
            currency,
            status_code,
            self.secret_hash
        ))
    }

    /// False on any mismatch, including an amount that does not parse.
    pub fn verify_notification(
        &self,
        order_id: &str,
        amount: &str,
        currency: &str,
        status_code: &str,
        provided_signature: &str,
    ) -> bool {
        let Ok(amount) = amount.trim().parse::<Decimal>() else {
            return false;
        };
        let expected = self.compute_notify_hash(order_id, amount, currency, status_code);
        constant_time_eq_ignore_case(&expected, provided_signature.trim())
    }

    pub fn verify(&self, notification: &PayHereNotification) -> bool {
        self.verify_notification(
            &notification.order_id,
            &notification.payhere_amount,
            &notification.payhere_currency,
            &notification.status_code,
            &notification.md5sig,
        )
    }
}

fn constant_time_eq_ignore_case(expected: &str, provided: &str) -> bool {
    if expected.len() != provided.len() {
        return false;
    }

    expected
        .bytes()
        .zip(provided.bytes())
        .fold(0u8, |acc, (a, b)| {
            acc | (a.to_ascii_uppercase() ^ b.to_ascii_uppercase())
        })
        == 0
}

/// Customer block of the hosted checkout form, already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutCustomer {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub country: String,
}

/// Form fields posted to the hosted checkout page. Field names are the provider's own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PayHereCheckoutFields {
    pub merchant_id: String,
    pub return_url: String,
    pub cancel_url: String,
    pub notify_url: String,
    pub order_id: String,
    pub items: String,
    pub currency: String,
    pub amount: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackUrls {
    pub return_url: Url,
    pub cancel_url: Url,
    pub notify_url: Url,
}

fn join_path(base: &Url, path: &str) -> Result<Url> {
    let joined = format!("{}/{}", base.as_str().trim_end_matches('/'), path);
    Url::parse(&joined).with_context(|| format!("invalid callback url {joined}"))
}

#[derive(Debug, Clone)]
pub struct PayHereCheckout {
    signer: PayHereSigner,
    checkout_url: Url,
    currency: String,
    public_base_url: Url,
    api_base_url: Url,
}

impl PayHereCheckout {
    pub fn new(settings: &PayHereSettings) -> Self {
        Self {
            signer: PayHereSigner::new(settings.merchant_id.clone(), &settings.merchant_secret),
            checkout_url: settings.checkout_url.clone(),
            currency: settings.currency.clone(),
            public_base_url: settings.public_base_url.clone(),
            api_base_url: settings.api_base_url.clone(),
        }
    }

    pub fn signer(&self) -> &PayHereSigner {
        &self.signer
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn action_url(&self) -> &str {
        self.checkout_url.as_str()
    }

    pub fn callback_urls(&self, order_id: &str) -> Result<CallbackUrls> {
        let mut return_url = join_path(&self.public_base_url, "payment/return")?;
        return_url.query_pairs_mut().append_pair("orderId", order_id);

        let mut cancel_url = join_path(&self.public_base_url, "payment/cancel")?;
        cancel_url.query_pairs_mut().append_pair("orderId", order_id);

        let notify_url = join_path(&self.api_base_url, "api/v1/payments/payhere/notify")?;

        Ok(CallbackUrls {
            return_url,
            cancel_url,
            notify_url,
        })
    }

    pub fn build_fields(
        &self,
        order_id: &str,
        amount: Decimal,
        items: &str,
        customer: CheckoutCustomer,
    ) -> Result<PayHereCheckoutFields> {
        let urls = self.callback_urls(order_id)?;

        Ok(PayHereCheckoutFields {
            merchant_id: self.signer.merchant_id().to_string(),
            return_url: urls.return_url.into(),
            cancel_url: urls.cancel_url.into(),
            notify_url: urls.notify_url.into(),
            order_id: order_id.to_string(),
            items: items.to_string(),
            currency: self.currency.clone(),
            amount: format_amount(amount),
            first_name: customer.first_name,
            last_name: customer.last_name,
            email: customer.email,
            phone: customer.phone,
            address: customer.address,
            city: customer.city,
            country: customer.country,
            hash: self.signer.compute_create_hash(order_id, amount, &self.currency),
        })
    }
}

#[automock]
pub trait OrderIdGenerator {
    fn next_order_id(&self) -> String;
}

/// `<PREFIX>-<6 upper-case alphanumerics>-<unix millis>`
#[derive(Debug, Clone)]
pub struct RandomOrderIds {
    prefix: String,
}

impl RandomOrderIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl OrderIdGenerator for RandomOrderIds {
    fn next_order_id(&self) -> String {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..ORDER_SUFFIX_LEN)
            .map(|_| ORDER_SUFFIX_CHARSET[rng.gen_range(0..ORDER_SUFFIX_CHARSET.len())] as char)
            .collect();

        format!("{}-{}-{}", self.prefix, suffix, Utc::now().timestamp_millis())
    }
}
