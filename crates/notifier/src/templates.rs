//! Fixed Portuguese message templates.

use chrono::DateTime;
use chrono_tz::Tz;

use relay_common::types::Template;

/// Render the body for a template.
///
/// `meeting_hm` is the local `HH:MM` of the meeting; `meeting_full` the full
/// pt-BR formatted timestamp (used by the confirmation); `link` is appended
/// to the confirmation when configured.
pub fn render(
    template: Template,
    first_name: &str,
    meeting_hm: &str,
    meeting_full: &str,
    link: Option<&str>,
) -> String {
    match template {
        Template::OneDayBefore => format!(
            "Olá {first_name}, amanhã temos nossa reunião às {meeting_hm}. \
             Estamos ansiosos para falar com você!"
        ),
        Template::FourHoursBefore => {
            format!("Oi {first_name}, tudo certo para a nossa reunião hoje às {meeting_hm}?")
        }
        Template::OneHourAfter => format!(
            "{first_name}, obrigado pela reunião! Qualquer dúvida, estamos à disposição."
        ),
        Template::Confirmation => {
            let mut body = format!(
                "Olá {first_name}, sua reunião foi confirmada para {meeting_full}. Até lá!"
            );
            if let Some(link) = link {
                body.push('\n');
                body.push_str(link);
            }
            body
        }
    }
}

/// Format a local timestamp the way the lead-facing records expect it:
/// `dd/mm/yyyy - hh:mmam|pm`.
pub fn format_pt_br(dt: &DateTime<Tz>) -> String {
    dt.format("%d/%m/%Y - %I:%M%p").to_string().to_lowercase()
}
