//! HTML renderers for receipts and reports.
//!
//! Every function returns a complete, self-contained page. All data coming
//! from the database goes through [`esc`].

use std::borrow::Cow;

use chrono::NaiveDateTime;
use quick_xml::escape::escape;

use super::{BorrowerLoans, BuildingPlan};
use crate::models::{Borrower, LoanWithDetails};
use crate::services::KeyWithAvailability;
use crate::services::loan_service::DATE_FORMAT;

const STYLE: &str = "\
body { font-family: Arial, sans-serif; margin: 2em; color: #222; }
h1 { font-size: 1.6em; margin-bottom: 0.2em; }
.meta { color: #666; font-size: 0.9em; }
table { border-collapse: collapse; width: 100%; margin-top: 1em; }
th, td { border: 1px solid #999; padding: 4px 8px; text-align: left; }
th { background: #eee; }
h2 { background: #dce6f0; padding: 4px 8px; font-size: 1.1em; }
.empty { font-style: italic; color: #777; }
.signature { margin-top: 3em; height: 4em; border-bottom: 1px solid #222; width: 50%; }
.out { color: #a00; font-weight: bold; }";

fn esc(text: &str) -> Cow<'_, str> {
    escape(text)
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"fr\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n<style>\n{STYLE}\n</style>\n</head>\n<body>\n\
         <h1>{title}</h1>\n{body}</body>\n</html>\n",
        title = esc(title),
    )
}

/// `2024-03-01 09:30:00` -> `01/03/2024 à 09:30`; anything else is shown as is.
pub fn display_datetime(stored: &str) -> String {
    match NaiveDateTime::parse_from_str(stored, DATE_FORMAT) {
        Ok(dt) => dt.format("%d/%m/%Y à %H:%M").to_string(),
        Err(_) => stored.to_string(),
    }
}

/// Date part only
pub fn display_date(stored: &str) -> String {
    match NaiveDateTime::parse_from_str(stored, DATE_FORMAT) {
        Ok(dt) => dt.format("%d/%m/%Y").to_string(),
        Err(_) => stored.to_string(),
    }
}

fn generated(generated_at: &str) -> String {
    format!(
        "<p class=\"meta\">Généré le {}</p>\n",
        esc(&display_datetime(generated_at))
    )
}

fn pledge(name: &str, count: usize) -> String {
    let text = if count == 1 {
        format!(
            "Je soussigné(e), {name}, reconnais avoir reçu la clé mentionnée ci-dessus. \
             Je m'engage à en prendre soin et à la restituer à la fin de son utilisation. \
             En cas de perte ou de dégradation, je suis conscient(e) que ma responsabilité \
             pourra être engagée."
        )
    } else {
        format!(
            "Je soussigné(e), {name}, reconnais avoir reçu les {count} clé(s) mentionnée(s) \
             ci-dessus. Je m'engage à en prendre soin et à les restituer à la fin de leur \
             utilisation. En cas de perte ou de dégradation, je suis conscient(e) que ma \
             responsabilité pourra être engagée."
        )
    };
    format!(
        "<p>{}</p>\n<p>Signature de l'emprunteur :</p>\n<div class=\"signature\"></div>\n",
        esc(&text)
    )
}

/// Receipt for a single loan
pub fn render_loan_receipt(loan: &LoanWithDetails) -> String {
    let description = loan.key_description.as_deref().unwrap_or("");
    let body = format!(
        "<table>\n\
         <tr><th>Numéro de la clé</th><td>{}</td></tr>\n\
         <tr><th>Description</th><td>{}</td></tr>\n\
         <tr><th>Emprunté par</th><td>{}</td></tr>\n\
         <tr><th>Date d'emprunt</th><td>{}</td></tr>\n\
         </table>\n{}",
        esc(&loan.key_number),
        esc(description),
        esc(&loan.borrower_name),
        esc(&display_datetime(&loan.loan_date)),
        pledge(&loan.borrower_name, 1),
    );
    page("Bon de sortie de clé", &body)
}

/// Receipt listing every key a borrower currently holds
pub fn render_borrower_receipt(
    borrower: &Borrower,
    loans: &[LoanWithDetails],
    generated_at: &str,
) -> String {
    let mut body = format!(
        "<table>\n\
         <tr><th>Emprunté par</th><td>{}</td></tr>\n\
         <tr><th>Date</th><td>{}</td></tr>\n\
         <tr><th>Nombre de clés</th><td>{}</td></tr>\n\
         </table>\n<h2>Liste des clés empruntées</h2>\n<ol>\n",
        esc(&borrower.name),
        esc(&display_datetime(generated_at)),
        loans.len(),
    );
    for loan in loans {
        body.push_str(&format!(
            "<li>{} - {} ({})</li>\n",
            esc(&loan.key_number),
            esc(loan.key_description.as_deref().unwrap_or("")),
            esc(&display_date(&loan.loan_date)),
        ));
    }
    body.push_str("</ol>\n");
    body.push_str(&pledge(&borrower.name, loans.len()));

    page("Bon de sortie de clés", &body)
}

/// Buildings, their rooms and the keys opening each room
pub fn render_key_plan(plan: &[BuildingPlan], generated_at: &str) -> String {
    let mut body = generated(generated_at);

    if plan.is_empty() {
        body.push_str("<p class=\"empty\">Aucun bâtiment</p>\n");
    }

    for entry in plan {
        body.push_str(&format!("<h2>{}</h2>\n", esc(&entry.building.name)));
        if entry.rooms.is_empty() {
            body.push_str("<p class=\"empty\">(Aucune salle)</p>\n");
            continue;
        }

        body.push_str("<table>\n<tr><th>Salle</th><th>Type</th><th>Clés</th></tr>\n");
        for room_plan in &entry.rooms {
            let keys = if room_plan.keys.is_empty() {
                "<span class=\"empty\">Aucune clé</span>".to_string()
            } else {
                room_plan
                    .keys
                    .iter()
                    .map(|k| esc(&k.number).into_owned())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            body.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                esc(&room_plan.room.name),
                esc(room_plan.room.r#type.as_deref().unwrap_or("")),
                keys,
            ));
        }
        body.push_str("</table>\n");
    }

    page("Plan de clés", &body)
}

/// Table of all active loans
pub fn render_loans_report(loans: &[LoanWithDetails], generated_at: &str) -> String {
    let mut body = generated(generated_at);
    body.push_str(&format!(
        "<p>Nombre total d'emprunts actifs : {}</p>\n",
        loans.len()
    ));
    body.push_str(
        "<table>\n<tr><th>Clé</th><th>Description</th><th>Emprunteur</th><th>Date</th></tr>\n",
    );
    for loan in loans {
        body.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            esc(&loan.key_number),
            esc(loan.key_description.as_deref().unwrap_or("")),
            esc(&loan.borrower_name),
            esc(&display_date(&loan.loan_date)),
        ));
    }
    body.push_str("</table>\n");

    page("Rapport des clés sorties", &body)
}

/// Active loans, one section per borrower
pub fn render_borrower_report(groups: &[BorrowerLoans], generated_at: &str) -> String {
    let total: usize = groups.iter().map(|g| g.loans.len()).sum();
    let mut body = generated(generated_at);
    body.push_str(&format!(
        "<p>Total : {} emprunteurs, {} clés sorties</p>\n",
        groups.len(),
        total
    ));

    for group in groups {
        body.push_str(&format!(
            "<h2>{} ({})</h2>\n<ul>\n",
            esc(&group.borrower_name),
            group.loans.len()
        ));
        for loan in &group.loans {
            body.push_str(&format!(
                "<li>{} - {} (depuis le {})</li>\n",
                esc(&loan.key_number),
                esc(loan.key_description.as_deref().unwrap_or("")),
                esc(&display_date(&loan.loan_date)),
            ));
        }
        body.push_str("</ul>\n");
    }

    page("Rapport global des emprunts", &body)
}

/// Stock figures for every key
pub fn render_stock_report(keys: &[KeyWithAvailability], generated_at: &str) -> String {
    let mut body = generated(generated_at);
    body.push_str(
        "<table>\n<tr><th>Clé</th><th>Description</th><th>Total</th><th>Réserve</th>\
         <th>Sorties</th><th>Disponibles</th><th>Emplacement</th><th>Emprunteurs</th></tr>\n",
    );
    for entry in keys {
        let key = &entry.key;
        let class = if entry.is_borrowable() { "" } else { " class=\"out\"" };
        body.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
             <td{}>{}</td><td>{}</td><td>{}</td></tr>\n",
            esc(&key.number),
            esc(key.description.as_deref().unwrap_or("")),
            key.quantity_total,
            key.quantity_reserve,
            entry.loaned_count,
            class,
            entry.available_count,
            esc(key.storage_location.as_deref().unwrap_or("")),
            esc(&entry.borrower_names.join(", ")),
        ));
    }
    body.push_str("</table>\n");

    page("État du stock de clés", &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_loan() -> LoanWithDetails {
        LoanWithDetails {
            id: 7,
            key_id: 1,
            borrower_id: 2,
            loan_date: "2024-03-01 09:30:00".to_string(),
            return_date: None,
            key_number: "K001".to_string(),
            key_description: Some("Clé <principale>".to_string()),
            borrower_name: "Jean & Fils".to_string(),
            borrower_email: None,
        }
    }

    #[test]
    fn user_text_is_escaped() {
        let html = render_loan_receipt(&sample_loan());
        assert!(html.contains("Clé &lt;principale&gt;"));
        assert!(html.contains("Jean &amp; Fils"));
        assert!(!html.contains("<principale>"));
    }

    #[test]
    fn dates_are_shown_french_style() {
        assert_eq!(display_datetime("2024-03-01 09:30:00"), "01/03/2024 à 09:30");
        assert_eq!(display_date("2024-03-01 09:30:00"), "01/03/2024");
        assert_eq!(display_date("hier"), "hier");
    }

    #[test]
    fn loans_report_counts_rows() {
        let loans = vec![sample_loan(), sample_loan()];
        let html = render_loans_report(&loans, "2024-03-02 10:00:00");
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Nombre total d'emprunts actifs : 2"));
        assert!(html.contains("Généré le 02/03/2024 à 10:00"));
    }
}
