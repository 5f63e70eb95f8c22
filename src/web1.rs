//! WEB1 Account Source
//!
//! Loads phone-number/credential records from the CSV file at
//! `WEB1_DATA_PATH` and selects an unused account for assignment.
//! Selection is read-only: there is no reservation, so two concurrent
//! callers can pick the same account. That race is a documented risk of
//! the assignment flow, owned by whoever patches the avatar afterwards.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use crate::types::Web1Account;

const EXPECTED_COLUMNS: &[&str] = &[
    "item_id",
    "user_id",
    "origin_country",
    "phone_number",
    "password",
    "2fa_password",
];

/// Load WEB1 accounts from the CSV file at `path`.
///
/// The first row is a header; column positions are taken from it, so
/// reordered columns are tolerated. Rows missing a required field are
/// skipped with a warning rather than failing the whole load.
pub fn load_accounts(path: &Path) -> Result<Vec<Web1Account>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read WEB1 data file {}", path.display()))?;
    parse_accounts(&contents)
}

pub fn parse_accounts(contents: &str) -> Result<Vec<Web1Account>> {
    let mut lines = contents.lines();
    let header = lines.next().context("WEB1 data file is empty")?;

    let columns: Vec<&str> = header.split(',').map(str::trim).collect();
    let index_of = |name: &str| -> Result<usize> {
        columns
            .iter()
            .position(|c| *c == name)
            .with_context(|| format!("WEB1 data file is missing the '{}' column", name))
    };

    let item_id = index_of(EXPECTED_COLUMNS[0])?;
    let user_id = index_of(EXPECTED_COLUMNS[1])?;
    let origin_country = index_of(EXPECTED_COLUMNS[2])?;
    let phone_number = index_of(EXPECTED_COLUMNS[3])?;
    let password = index_of(EXPECTED_COLUMNS[4])?;
    // The 2FA column is optional in older exports.
    let two_fa = columns.iter().position(|c| *c == EXPECTED_COLUMNS[5]);

    let mut accounts = Vec::new();
    for (line_no, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();

        let field = |idx: usize| fields.get(idx).copied().unwrap_or("");
        let account = Web1Account {
            item_id: field(item_id).to_string(),
            user_id: field(user_id).to_string(),
            origin_country: field(origin_country).to_string(),
            phone_number: field(phone_number).to_string(),
            password: field(password).to_string(),
            two_fa_password: two_fa
                .map(field)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
        };

        if account.phone_number.is_empty() || account.origin_country.is_empty() {
            warn!("Skipping malformed WEB1 row {}", line_no + 2);
            continue;
        }
        accounts.push(account);
    }

    Ok(accounts)
}

/// Pick the first account (in file order) whose country is allow-listed
/// and whose phone number no avatar is already using. Returns `None`
/// when nothing qualifies; that is a normal outcome, not an error.
pub fn assign_web1_account<'a>(
    accounts: &'a [Web1Account],
    allowed_countries: &[String],
    used_phone_numbers: &HashSet<String>,
) -> Option<&'a Web1Account> {
    accounts.iter().find(|account| {
        allowed_countries
            .iter()
            .any(|c| c == &account.origin_country)
            && !used_phone_numbers.contains(&account.phone_number)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(country: &str, phone: &str) -> Web1Account {
        Web1Account {
            item_id: format!("item-{}", phone),
            user_id: format!("user-{}", phone),
            origin_country: country.to_string(),
            phone_number: phone.to_string(),
            password: "pw".to_string(),
            two_fa_password: None,
        }
    }

    fn countries(list: &[&str]) -> Vec<String> {
        list.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_assign_returns_none_when_only_candidate_is_used() {
        let accounts = vec![account("US", "1"), account("FR", "2")];
        let used: HashSet<String> = ["2".to_string()].into_iter().collect();

        let picked = assign_web1_account(&accounts, &countries(&["FR"]), &used);
        assert!(picked.is_none());
    }

    #[test]
    fn test_assign_picks_first_match_in_list_order() {
        let accounts = vec![account("US", "1"), account("FR", "2")];
        let used = HashSet::new();

        let picked = assign_web1_account(&accounts, &countries(&["US", "FR"]), &used).unwrap();
        assert_eq!(picked.phone_number, "1");
    }

    #[test]
    fn test_assign_with_empty_allow_list() {
        let accounts = vec![account("US", "1")];
        let used = HashSet::new();
        assert!(assign_web1_account(&accounts, &[], &used).is_none());
    }

    #[test]
    fn test_parse_accounts_header_driven() {
        let csv = "\
item_id,user_id,origin_country,phone_number,password,2fa_password
i1,u1,US,111,pw1,tfa1
i2,u2,FR,222,pw2,
";
        let accounts = parse_accounts(csv).unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].two_fa_password.as_deref(), Some("tfa1"));
        assert_eq!(accounts[1].two_fa_password, None);
        assert_eq!(accounts[1].origin_country, "FR");
    }

    #[test]
    fn test_parse_accounts_reordered_columns_and_bad_rows() {
        let csv = "\
phone_number,origin_country,item_id,user_id,password
111,US,i1,u1,pw1
,DE,i2,u2,pw2
222,FR,i3,u3,pw3
";
        let accounts = parse_accounts(csv).unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].phone_number, "111");
        assert_eq!(accounts[1].origin_country, "FR");
    }

    #[test]
    fn test_parse_accounts_missing_column_is_an_error() {
        let csv = "item_id,user_id,phone_number,password\ni1,u1,111,pw";
        assert!(parse_accounts(csv).is_err());
    }
}
