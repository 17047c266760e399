use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum RoomStatus {
    Available,
    Occupied,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum DueStatus {
    Pending,
    Paid,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ComplaintStatus {
    Open,
    InProgress,
    Resolved,
}

#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct Room {
    pub id: i64,
    pub room_number: String,
    pub status: RoomStatus,
    pub current_occupancy: i64,
}

/// Room roster line with its tenant (if any) and open work counts.
#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct RoomOverview {
    pub id: i64,
    pub room_number: String,
    pub status: RoomStatus,
    pub current_occupancy: i64,
    pub tenant_id: Option<i64>,
    pub tenant_name: Option<String>,
    pub due_count: i64,
    pub complaint_count: i64,
}

/// Tenant as shown to the owner and on the tenant dashboard. Never carries
/// the password hash.
#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct TenantDetail {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub deposit: i64,
    pub joined_at: String,
    pub room_id: i64,
    pub room_number: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct TenantCredentials {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub room_id: i64,
    pub pwd_hash: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct Due {
    pub id: i64,
    pub tenant_id: i64,
    pub amount: i64,
    pub month: String,
    pub due_date: String,
    pub status: DueStatus,
    pub generated_at: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, FromRow)]
pub struct MonthSummary {
    pub month: String,
    pub count: i64,
    pub total: i64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, FromRow)]
pub struct TenantSummary {
    pub tenant_id: i64,
    pub name: String,
    pub room_id: i64,
    pub room_number: String,
    pub total_due: i64,
    pub months: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct Complaint {
    pub id: i64,
    pub tenant_id: i64,
    pub title: String,
    pub description: String,
    pub status: ComplaintStatus,
    pub created_at: String,
}

/// Complaint joined with who raised it, for the owner's log.
#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct ComplaintEntry {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: ComplaintStatus,
    pub created_at: String,
    pub tenant_name: String,
    pub room_number: String,
}

#[derive(Serialize, Debug)]
pub struct TenantOverview {
    pub tenant: TenantDetail,
    pub dues: Vec<Due>,
    pub complaints: Vec<Complaint>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DueSummary {
    pub by_month: Vec<MonthSummary>,
    pub by_tenant: Vec<TenantSummary>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Tenant,
}

#[derive(Serialize, Debug)]
pub struct SessionUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct Login {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTenant {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub room_id: i64,
    #[serde(default)]
    pub deposit: Amount,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDue {
    pub tenant_id: i64,
    pub amount: Amount,
    pub month: String,
    pub due_date: NaiveDate,
}

/// Id of a single due to mark paid; `None` when the body left it out.
#[derive(Deserialize)]
pub struct MarkPaid {
    pub id: Option<i64>,
}

#[derive(Deserialize)]
pub struct MarkPaidBulk {
    pub ids: Vec<i64>,
}

#[derive(Deserialize)]
pub struct NewComplaint {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Deserialize)]
pub struct ComplaintStatusUpdate {
    pub id: i64,
    pub status: ComplaintStatus,
}

/// Money as whole currency units. Form inputs post numbers as strings, so
/// both `5000` and `"5000"` are accepted. Fractions such as `5000.50` are
/// rejected rather than rounded.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(try_from = "AmountInput")]
pub struct Amount(pub i64);

#[derive(Deserialize)]
#[serde(untagged)]
enum AmountInput {
    Number(i64),
    Fractional(f64),
    Text(String),
}

fn not_whole(raw: impl std::fmt::Display) -> String {
    format!("amount must be a whole number of currency units, got {raw}")
}

impl TryFrom<AmountInput> for Amount {
    type Error = String;

    fn try_from(input: AmountInput) -> Result<Self, Self::Error> {
        match input {
            AmountInput::Number(n) => Ok(Amount(n)),
            AmountInput::Fractional(f) => Err(not_whole(f)),
            AmountInput::Text(s) => {
                let trimmed = s.trim();
                match trimmed.parse::<i64>() {
                    Ok(n) => Ok(Amount(n)),
                    Err(_) if trimmed.parse::<f64>().is_ok() => Err(not_whole(trimmed)),
                    Err(_) => Err(format!("amount must be a number, got {s:?}")),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn amount_accepts_numbers_and_numeric_strings() {
        let due: NewDue = serde_json::from_str(
            r#"{"tenantId": 1, "amount": "5000", "month": "December 2025", "dueDate": "2025-12-05"}"#,
        )
        .unwrap();
        assert_eq!(due.amount, Amount(5000));

        let due: NewDue = serde_json::from_str(
            r#"{"tenantId": 1, "amount": 4200, "month": "December 2025", "dueDate": "2025-12-05"}"#,
        )
        .unwrap();
        assert_eq!(due.amount, Amount(4200));
    }

    #[test]
    fn amount_rejects_garbage() {
        let res: Result<NewDue, _> = serde_json::from_str(
            r#"{"tenantId": 1, "amount": "lots", "month": "December 2025", "dueDate": "2025-12-05"}"#,
        );
        let err = res.err().unwrap().to_string();
        assert!(err.contains("amount must be a number"), "{err}");
    }

    #[rstest]
    #[case(r#""5000.50""#, "got 5000.50")]
    #[case("5000.5", "got 5000.5")]
    #[case(r#"" 12.25 ""#, "got 12.25")]
    fn amount_names_whole_unit_rule_for_fractions(#[case] amount: &str, #[case] shown: &str) {
        let body = format!(
            r#"{{"tenantId": 1, "amount": {amount}, "month": "December 2025", "dueDate": "2025-12-05"}}"#
        );
        let err = serde_json::from_str::<NewDue>(&body).err().unwrap().to_string();
        assert!(err.contains("whole number of currency units"), "{err}");
        assert!(err.contains(shown), "{err}");
    }

    #[test]
    fn complaint_status_uses_snake_case() {
        let update: ComplaintStatusUpdate =
            serde_json::from_str(r#"{"id": 3, "status": "in_progress"}"#).unwrap();
        assert_eq!(update.status, ComplaintStatus::InProgress);
        assert!(serde_json::from_str::<ComplaintStatusUpdate>(r#"{"id": 3, "status": "closed"}"#)
            .is_err());
    }
}
