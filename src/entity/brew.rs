use crate::record::{Record, RecordId, RecordType};
use crate::resource::CrudResource;
use crate::sql::{NamedQuery, Parameters};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// CRUD resource for brews, served under `/api/brews`.
pub type BrewResource<P> = CrudResource<Brew, P>;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brew {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_gravity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_gravity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abv: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_brewed: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_fermentation_end: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_fermentation_end: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_drinkable: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_bottles: Option<i32>,
}

/// Brews with `dateBrewed` inside `[from, to]`. ISO dates compare correctly as strings.
fn brewed_between(row: &Value, params: &Parameters) -> bool {
    let (Some(date), Some(from), Some(to)) = (
        row.get("dateBrewed").and_then(Value::as_str),
        params.get("from").and_then(Value::as_str),
        params.get("to").and_then(Value::as_str),
    ) else {
        return false;
    };
    from <= date && date <= to
}

impl Record for Brew {
    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn record_type() -> RecordType {
        RecordType::new("Brew")
            .column("name", Some("text"))
            .column("original_gravity", Some("float8"))
            .column("final_gravity", Some("float8"))
            .column("abv", Some("float8"))
            .column("date_brewed", Some("date"))
            .column("primary_fermentation_end", Some("date"))
            .column("secondary_fermentation_end", Some("date"))
            .column("date_drinkable", Some("date"))
            .column("number_of_bottles", Some("int4"))
            .named_query(NamedQuery::new("Brew.findByName", "\"name\" = :name"))
            .named_query(
                NamedQuery::new(
                    "Brew.findBrewedBetween",
                    "\"date_brewed\" BETWEEN :from::date AND :to::date",
                )
                .order_by("\"date_brewed\", \"id\"")
                .matching(brewed_between),
            )
    }
}
