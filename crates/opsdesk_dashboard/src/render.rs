use opsdesk_contract::FileRecord;

use crate::row::RowState;

/// Plain-text transfer table. NEW records are skipped.
pub fn render_table(rows: &[FileRecord]) -> String {
    let mut out = format!(
        "{:<38} {:<32} {:<20} {:<18} {}\n",
        "ID", "FILE NAME", "DESTINATION", "STATUS", "ACTION"
    );

    let mut shown = 0;
    for record in rows {
        let Some(row) = RowState::for_status(record.status) else {
            continue;
        };
        let action = if row.transfer_enabled {
            format!("[{}]", row.label)
        } else {
            row.label.to_string()
        };
        out.push_str(&format!(
            "{:<38} {:<32} {:<20} {:<18} {}\n",
            record.id, record.file_name, record.destination_group, record.status, action
        ));
        shown += 1;
    }

    if shown == 0 {
        out.push_str("No files in the transfer queue.\n");
    }
    out
}

pub fn render_notifications(notifications: &[FileRecord]) -> String {
    if notifications.is_empty() {
        return "No new files.\n".to_string();
    }

    notifications
        .iter()
        .map(|n| {
            format!(
                "* {} ({}) -> {}  [Get File]\n",
                n.file_name, n.id, n.destination_group
            )
        })
        .collect()
}
