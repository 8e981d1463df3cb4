//! CSV export of user records.

use crate::database::UserRecord;

const HEADER: &str = "User ID,First Name,Username,Custom Username,Referrals,Verified,Referred By,Join Date,Last Check";

/// Render every record as one CSV document.
pub fn users_to_csv(records: &[UserRecord]) -> String {
    let mut out = String::with_capacity(64 * (records.len() + 1));
    out.push_str(HEADER);
    out.push('\n');

    for user in records {
        let fields = [
            user.user_id.to_string(),
            field(&user.first_name),
            field(user.username.as_deref().unwrap_or("")),
            field(user.custom_username.as_deref().unwrap_or("")),
            user.referral_count.to_string(),
            user.verified.to_string(),
            user.referred_by.map(|id| id.to_string()).unwrap_or_default(),
            user.joined_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            user.last_check
                .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }

    out
}

/// Quote a field when it contains a separator, quote or line break.
fn field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
