//! # Output Rendering
//!
//! Records go to stdout either as an aligned text table or, with `--json`,
//! as pretty-printed JSON. Logs stay on stderr.
//!
//! ```text
//! ID        NAME     STATUS
//! 5d1e...   Sara     available
//! 90ab...   Omar     busy
//! ```

use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::Serialize;

use relief_core::{
    AffectedPerson, Alert, AuditLog, AvailableTask, Disaster, Donation, Feedback, InventoryItem,
    Notification, NgoSummary, ReliefCamp, Report, ResourceAllocation, ResourceStockView,
    ResourceTransfer, ResourceType, Shelter, SosRequestView, Task, TaskHistory, UserAccount,
    VolunteerSummary,
};

use crate::error::ApiResult;

/// Text shown for missing values.
const EMPTY: &str = "-";

#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Output { json }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    /// Prints rows as a table, or a JSON array.
    pub fn list<T: TableRow + Serialize>(&self, rows: &[T]) -> ApiResult<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(rows)?);
        } else if rows.is_empty() {
            println!("(none)");
        } else {
            print!("{}", render_table(T::HEADERS, rows.iter().map(TableRow::cells)));
        }
        Ok(())
    }

    /// Prints one record: JSON, or the given line of text.
    pub fn record<T: Serialize>(&self, item: &T, text: impl Display) -> ApiResult<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(item)?);
        } else {
            println!("{}", text);
        }
        Ok(())
    }

    /// Prints one record as `key: value` lines.
    pub fn detail<T: Serialize>(&self, item: &T, fields: &[(&str, String)]) -> ApiResult<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(item)?);
        } else {
            print!("{}", render_fields(fields));
        }
        Ok(())
    }

    /// Confirmation line; `{"message": ...}` in JSON mode.
    pub fn message(&self, text: impl Display) -> ApiResult<()> {
        let text = text.to_string();
        if self.json {
            println!("{}", serde_json::json!({ "message": text }));
        } else {
            println!("{}", text);
        }
        Ok(())
    }
}

/// A record that can be shown as one table row.
pub trait TableRow {
    const HEADERS: &'static [&'static str];

    fn cells(&self) -> Vec<String>;
}

/// Left-aligned columns separated by two spaces; one line per row.
pub fn render_table(headers: &[&str], rows: impl IntoIterator<Item = Vec<String>>) -> String {
    let rows: Vec<Vec<String>> = rows.into_iter().collect();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let mut out = String::new();
    let header: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    for row in std::iter::once(&header).chain(rows.iter()) {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn render_fields(fields: &[(&str, String)]) -> String {
    let width = fields.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    fields
        .iter()
        .map(|(key, value)| format!("{:<width$}  {}\n", format!("{}:", key), value, width = width + 1))
        .collect()
}

pub fn opt<T: Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| EMPTY.to_string())
}

pub fn time(value: &DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M").to_string()
}

pub fn opt_time(value: &Option<DateTime<Utc>>) -> String {
    value.as_ref().map(time).unwrap_or_else(|| EMPTY.to_string())
}

pub fn yes_no(value: bool) -> String {
    if value { "yes" } else { "no" }.to_string()
}

// =============================================================================
// Rows
// =============================================================================

impl TableRow for UserAccount {
    const HEADERS: &'static [&'static str] = &["ID", "NAME", "EMAIL", "PHONE", "ROLE", "LOCATION"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.email.clone(),
            opt(&self.phone),
            self.role.to_string(),
            opt(&self.location),
        ]
    }
}

impl TableRow for NgoSummary {
    const HEADERS: &'static [&'static str] =
        &["ID", "ORGANIZATION", "CONTACT", "EMAIL", "REGION", "VERIFIED", "RESOURCES"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.org_name.clone(),
            self.contact_person.clone().unwrap_or_else(|| self.name.clone()),
            self.email.clone(),
            opt(&self.region),
            yes_no(self.verified),
            yes_no(self.can_manage_resources),
        ]
    }
}

impl TableRow for VolunteerSummary {
    const HEADERS: &'static [&'static str] =
        &["ID", "NAME", "SKILLS", "LOCATION", "STATUS", "VERIFIED", "LAST ACTIVE"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            opt(&self.skills),
            opt(&self.location),
            self.status.to_string(),
            yes_no(self.verified),
            opt_time(&self.last_active),
        ]
    }
}

impl TableRow for SosRequestView {
    const HEADERS: &'static [&'static str] = &[
        "ID", "VICTIM", "NEED", "LOCATION", "URGENCY", "STATUS", "VOLUNTEER", "NGO", "CREATED",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.victim_name.clone(),
            self.type_of_need.clone(),
            self.location.clone(),
            self.urgency.to_string(),
            self.status.to_string(),
            opt(&self.volunteer_name),
            opt(&self.ngo_name),
            time(&self.created_at),
        ]
    }
}

impl TableRow for ResourceType {
    const HEADERS: &'static [&'static str] = &["ID", "NAME", "UNIT", "DESCRIPTION"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.unit.clone(),
            opt(&self.description),
        ]
    }
}

impl TableRow for ResourceStockView {
    const HEADERS: &'static [&'static str] =
        &["ID", "TYPE", "QUANTITY", "UNIT", "LOCATION", "OWNER", "STATUS", "UPDATED"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.type_name.clone(),
            self.quantity.to_string(),
            self.unit.clone(),
            opt(&self.location),
            opt(&self.owner_name),
            self.status.to_string(),
            time(&self.updated_at),
        ]
    }
}

impl TableRow for ResourceTransfer {
    const HEADERS: &'static [&'static str] =
        &["ID", "STOCK", "QUANTITY", "TO NGO", "TO LOCATION", "STATUS", "CREATED", "COMPLETED"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.stock_id.clone(),
            self.quantity.to_string(),
            opt(&self.to_ngo_id),
            opt(&self.to_location),
            self.status.to_string(),
            time(&self.created_at),
            opt_time(&self.completed_at),
        ]
    }
}

impl TableRow for ResourceAllocation {
    const HEADERS: &'static [&'static str] =
        &["ID", "STOCK", "REQUEST", "TARGET", "QUANTITY", "STATUS", "ALLOCATED"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.stock_id.clone(),
            opt(&self.request_id),
            format!("{} {}", self.target_type, self.target_id),
            self.quantity.to_string(),
            self.status.to_string(),
            time(&self.allocated_at),
        ]
    }
}

impl TableRow for Task {
    const HEADERS: &'static [&'static str] =
        &["ID", "TITLE", "TYPE", "STATUS", "VOLUNTEER", "LOCATION", "UPDATED"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.title.clone(),
            self.task_type.to_string(),
            self.status.to_string(),
            opt(&self.assigned_volunteer_id),
            opt(&self.location),
            time(&self.updated_at),
        ]
    }
}

impl TableRow for AvailableTask {
    const HEADERS: &'static [&'static str] =
        &["ID", "TITLE", "TYPE", "URGENCY", "LOCATION", "REQUEST", "CREATED"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.title.clone(),
            self.task_type.to_string(),
            self.urgency.to_string(),
            opt(&self.location),
            opt(&self.related_request_id),
            time(&self.created_at),
        ]
    }
}

impl TableRow for TaskHistory {
    const HEADERS: &'static [&'static str] = &["WHEN", "FROM", "TO", "BY", "NOTE"];

    fn cells(&self) -> Vec<String> {
        vec![
            time(&self.changed_at),
            opt(&self.previous_status),
            self.new_status.to_string(),
            opt(&self.changed_by),
            opt(&self.note),
        ]
    }
}

impl TableRow for Notification {
    const HEADERS: &'static [&'static str] = &["ID", "SENT", "CHANNEL", "STATUS", "MESSAGE"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            time(&self.created_at),
            self.channel.to_string(),
            self.status.to_string(),
            self.message.clone(),
        ]
    }
}

impl TableRow for Feedback {
    const HEADERS: &'static [&'static str] = &["ID", "REQUEST", "RATING", "COMMENTS", "GIVEN"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.request_id.clone(),
            format!("{}/5", self.rating),
            opt(&self.comments),
            time(&self.created_at),
        ]
    }
}

impl TableRow for Report {
    const HEADERS: &'static [&'static str] = &["ID", "KIND", "FILE", "BY", "GENERATED"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.report_type.to_string(),
            opt(&self.file_path),
            opt(&self.generated_by),
            time(&self.generated_at),
        ]
    }
}

impl TableRow for AuditLog {
    const HEADERS: &'static [&'static str] = &["WHEN", "ACTOR", "ACTION", "TABLE", "TARGET", "DETAILS"];

    fn cells(&self) -> Vec<String> {
        vec![
            time(&self.logged_at),
            opt(&self.actor_user_id),
            self.action.clone(),
            self.target_table.clone(),
            opt(&self.target_id),
            opt(&self.details),
        ]
    }
}

impl TableRow for Shelter {
    const HEADERS: &'static [&'static str] = &["ID", "NAME", "CAPACITY", "OCCUPIED", "FREE", "CONTACT"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.capacity.to_string(),
            self.current_occupancy.to_string(),
            self.free_places().to_string(),
            opt(&self.contact),
        ]
    }
}

impl TableRow for Disaster {
    const HEADERS: &'static [&'static str] = &["ID", "NAME", "TYPE", "LOCATION", "SEVERITY", "STATUS"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            opt(&self.disaster_type),
            opt(&self.location),
            opt(&self.severity),
            opt(&self.status),
        ]
    }
}

impl TableRow for AffectedPerson {
    const HEADERS: &'static [&'static str] =
        &["ID", "NAME", "AGE", "GENDER", "INJURY", "AID REQUIRED", "DISASTER"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            opt(&self.age),
            opt(&self.gender),
            opt(&self.injury_status),
            opt(&self.aid_required),
            opt(&self.disaster_id),
        ]
    }
}

impl TableRow for ReliefCamp {
    const HEADERS: &'static [&'static str] = &["ID", "NAME", "LOCATION", "CAPACITY", "IN CHARGE", "CONTACT"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            opt(&self.location),
            self.capacity.to_string(),
            opt(&self.incharge_name),
            opt(&self.contact),
        ]
    }
}

impl TableRow for InventoryItem {
    const HEADERS: &'static [&'static str] = &["ID", "ITEM", "QUANTITY", "CATEGORY", "CAMP", "UPDATED"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.item_name.clone(),
            self.quantity.to_string(),
            opt(&self.category),
            opt(&self.camp_id),
            time(&self.updated_at),
        ]
    }
}

impl TableRow for Donation {
    const HEADERS: &'static [&'static str] = &["ID", "DONOR", "AMOUNT", "TYPE", "NOTE", "DATE"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.donor_name.clone(),
            self.amount().to_string(),
            opt(&self.donation_type),
            opt(&self.note),
            time(&self.donated_at),
        ]
    }
}

impl TableRow for Alert {
    const HEADERS: &'static [&'static str] = &["ID", "SEVERITY", "LOCATION", "MESSAGE", "ISSUED"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            opt(&self.severity),
            opt(&self.location),
            self.message.clone(),
            time(&self.created_at),
        ]
    }
}
