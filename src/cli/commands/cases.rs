use anyhow::Result;
use serde::Serialize;

use blackbox_narrative::{ContentProvider, InMemoryContentProvider};
use blackbox_utils::error::BlackboxError;

use super::json_emit::emit_json;
use crate::ExitCode;

#[derive(Serialize)]
struct CaseListing {
    case_id: String,
    title: String,
    total_acts: u32,
}

/// List the built-in cases.
pub fn execute_cases_command(json: bool) -> Result<ExitCode> {
    let provider = InMemoryContentProvider::builtin().map_err(BlackboxError::from)?;
    let mut listings = Vec::new();
    for case_id in provider.case_ids() {
        let case = provider.load_case(&case_id).map_err(BlackboxError::from)?;
        listings.push(CaseListing {
            case_id: case.case_id,
            title: case.title,
            total_acts: case.total_acts,
        });
    }

    if json {
        println!("{}", emit_json(&listings, "cases")?);
    } else {
        for listing in &listings {
            println!(
                "  {:<8} {} ({} acts)",
                listing.case_id, listing.title, listing.total_acts
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}
