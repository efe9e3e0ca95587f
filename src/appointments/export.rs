//! CSV rendering of the admin listing.

use time::{macros::format_description, OffsetDateTime, UtcOffset};

use super::repo_types::AppointmentWithOwner;

pub const EXPORT_FILE_NAME: &str = "appointments_export.csv";

const HEADER: [&str; 7] = [
    "Username",
    "Name",
    "Type",
    "Service",
    "Date",
    "Status",
    "Created At",
];

pub fn to_csv(rows: &[AppointmentWithOwner]) -> Result<String, time::error::Format> {
    let mut out = String::new();
    push_record(&mut out, HEADER.iter().copied());

    for row in rows {
        let appt = &row.appointment;
        let date = stamp(appt.date)?;
        let created_at = stamp(appt.created_at)?;
        push_record(
            &mut out,
            [
                row.username.as_str(),
                row.owner_name.as_str(),
                appt.appointment_type.as_str(),
                appt.sub_type.as_str(),
                date.as_str(),
                appt.status.as_str(),
                created_at.as_str(),
            ]
            .into_iter(),
        );
    }
    Ok(out)
}

fn stamp(t: OffsetDateTime) -> Result<String, time::error::Format> {
    t.to_offset(UtcOffset::UTC)
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
}

fn push_record<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_field(out, field);
    }
    out.push_str("\r\n");
}

fn push_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\r', '\n']) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}
