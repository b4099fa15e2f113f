//! Raiffeisen online-banking portal client
//!
//! Speaks the portal's private JSON-over-HTTPS API: three POST endpoints
//! (login, account list, account turnover), each answering with a
//! BOM-prefixed JSON body. Account and transaction payloads are positional
//! arrays, decoded by offset.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};
use serde_json::{json, Value as JsonValue};
use url::Url;

use crate::domain::result::{Error, Result};
use crate::domain::transaction::text_at;
use crate::domain::{Account, Transaction};

/// Production portal base URL
pub const DEFAULT_BASE_URL: &str = "https://rol.raiffeisenbank.rs";

const LOGIN_PATH: &str = "/Retail/Protected/Services/RetailLoginService.svc/LoginFont";
const ACCOUNTS_PATH: &str = "/Retail/Protected/Services/DataService.svc/GetAllAccountBalance";
const TURNOVER_PATH: &str =
    "/Retail/Protected/Services/DataService.svc/GetTransactionalAccountTurnover";

const LOGIN_REFERER: &str = "/Retail/Home/Login";
const ACCOUNTS_REFERER: &str = "/Retail/user/accounts";

/// Grid names are part of the wire contract; the server keys the response
/// layout on them.
const ACCOUNTS_GRID: &str = "RetailAccountBalancePreviewFlat-L";
const TURNOVER_GRID: &str = "RetailAccountTurnoverTransactionDomesticPreviewMasterDetail-S";

/// Date format the turnover filter expects
const REMOTE_DATE_FORMAT: &str = "%d.%m.%Y";

/// Authenticated session client against the banking portal
///
/// `login` must be called first; it obtains the request token that every
/// subsequent call attaches as the `X-Holos-RequestToken` header.
pub struct RaiffeisenClient {
    client: Client,
    base_url: String,
    username: String,
    password_hash: String,
    request_token: Option<String>,
}

impl RaiffeisenClient {
    /// Create a client for the given portal base URL
    ///
    /// The password is the portal's pre-hashed form, never the plaintext.
    pub fn new(base_url: &str, username: &str, password_hash: &str) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| Error::config(format!("invalid portal base URL: {e}")))?;
        if parsed.scheme() != "https" && parsed.scheme() != "http" {
            return Err(Error::config(format!(
                "portal base URL must be http(s), got {}",
                parsed.scheme()
            )));
        }
        let base_url = base_url.trim_end_matches('/').to_string();

        // The portal serves a browser frontend and rejects requests that do
        // not look like one.
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/110.0",
            ),
        );
        headers.insert(
            "Accept",
            HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
        );
        headers.insert("Accept-Language", HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert(
            "Origin",
            HeaderValue::from_str(&base_url)
                .map_err(|e| Error::config(format!("invalid portal base URL: {e}")))?,
        );
        headers.insert("X-Holos-Session", HeaderValue::from_static("1"));
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
        headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("empty"));
        headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("cors"));
        headers.insert("Sec-Fetch-Site", HeaderValue::from_static("same-origin"));

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .cookie_store(true)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::protocol(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            request_token: None,
        })
    }

    /// Establish an authenticated session and capture the request token
    pub fn login(&mut self) -> Result<()> {
        let url = format!("{}{}", self.base_url, LOGIN_PATH);
        let response = self
            .client
            .post(&url)
            .header(REFERER, format!("{}{}", self.base_url, LOGIN_REFERER))
            .json(&json!({
                "username": self.username,
                "password": self.password_hash,
                "sessionID": 1,
            }))
            .send()
            .map_err(|e| Error::authentication(format!("login request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::authentication(format!(
                "login rejected with HTTP {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .map_err(|e| Error::authentication(format!("failed to read login response: {e}")))?;
        let data: JsonValue = decode_body(&body)
            .map_err(|_| Error::authentication("malformed login response body"))?;

        let token = data
            .get("RequestToken")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::authentication("login response carried no request token"))?;

        self.request_token = Some(token.to_string());
        Ok(())
    }

    /// Fetch the accounts visible to the authenticated user
    pub fn accounts(&self) -> Result<Vec<Account>> {
        let data = self.post_data(
            ACCOUNTS_PATH,
            &json!({ "gridName": ACCOUNTS_GRID }),
        )?;

        let rows = data
            .as_array()
            .ok_or_else(|| Error::protocol("account payload is not a row list"))?;

        rows.iter().map(account_from_row).collect()
    }

    /// Fetch one account's transactions within an inclusive date window
    ///
    /// `from_amount`/`to_amount` optionally bound the transaction amounts.
    /// A payload without a second element means "no transactions", not a
    /// protocol fault.
    pub fn transactions(
        &self,
        account: &Account,
        start_date: chrono::NaiveDate,
        end_date: chrono::NaiveDate,
        from_amount: Option<f64>,
        to_amount: Option<f64>,
    ) -> Result<Vec<Transaction>> {
        let body = json!({
            "accountNumber": account.number,
            "productCoreID": account.product_core_id,
            "filterParam": {
                "CurrencyCodeNumeric": account.currency_code,
                "FromDate": start_date.format(REMOTE_DATE_FORMAT).to_string(),
                "ToDate": end_date.format(REMOTE_DATE_FORMAT).to_string(),
                "FromAmount": from_amount,
                "ToAmount": to_amount,
            },
            "gridName": TURNOVER_GRID,
        });

        let data = self.post_data(TURNOVER_PATH, &body)?;
        transactions_from_payload(&data)
    }

    /// POST to an authenticated data endpoint and decode the BOM-prefixed body
    fn post_data(&self, path: &str, body: &JsonValue) -> Result<JsonValue> {
        let token = self
            .request_token
            .as_deref()
            .ok_or_else(|| Error::authentication("not logged in"))?;

        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .header(REFERER, format!("{}{}", self.base_url, ACCOUNTS_REFERER))
            .header("X-Holos-RequestToken", token)
            .json(body)
            .send()
            .map_err(map_request_error)?;

        if !response.status().is_success() {
            return Err(Error::protocol(format!(
                "portal answered HTTP {} for {}",
                response.status(),
                path
            )));
        }

        let text = response
            .text()
            .map_err(|e| Error::protocol(format!("failed to read response body: {e}")))?;
        decode_body(&text)
    }
}

/// Decode a portal response body, stripping the UTF-8 byte-order mark first
///
/// Every endpoint prefixes its JSON with a BOM; this is a quirk of the
/// upstream service, not negotiable.
pub(crate) fn decode_body(body: &str) -> Result<JsonValue> {
    let without_bom = body.strip_prefix('\u{feff}').unwrap_or(body);
    Ok(serde_json::from_str(without_bom)?)
}

/// Map an account-balance row to an Account
///
/// Positional contract: number=1, currency=3, product_core_id=13,
/// currency_code=14.
fn account_from_row(row: &JsonValue) -> Result<Account> {
    let cells = row
        .as_array()
        .ok_or_else(|| Error::protocol("account row is not an array"))?;
    if cells.len() < 15 {
        return Err(Error::protocol(format!(
            "account row has {} cells, expected at least 15",
            cells.len()
        )));
    }
    Ok(Account {
        number: text_at(cells, 1),
        currency: text_at(cells, 3),
        product_core_id: text_at(cells, 13),
        currency_code: text_at(cells, 14),
    })
}

/// Extract and normalize transaction rows from a turnover payload
///
/// The payload shape is `[[header, [row, ...]], ...]`; a missing second
/// element in the first group means the window held no transactions.
fn transactions_from_payload(data: &JsonValue) -> Result<Vec<Transaction>> {
    let groups = match data.as_array() {
        Some(groups) if !groups.is_empty() => groups,
        _ => return Ok(Vec::new()),
    };
    let first = groups[0]
        .as_array()
        .ok_or_else(|| Error::protocol("turnover payload group is not an array"))?;
    let rows = match first.get(1) {
        Some(rows) => rows
            .as_array()
            .ok_or_else(|| Error::protocol("turnover row list is not an array"))?,
        None => return Ok(Vec::new()),
    };

    rows.iter()
        .map(|row| {
            let cells = row
                .as_array()
                .ok_or_else(|| Error::protocol("turnover row is not an array"))?;
            Transaction::from_row(cells)
        })
        .collect()
}

/// Map transport errors to protocol errors with usable messages
fn map_request_error(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::protocol("portal request timed out after 30 seconds")
    } else if error.is_connect() {
        Error::protocol("unable to connect to the banking portal")
    } else {
        Error::protocol(format!("portal request failed: {error}"))
    }
}
