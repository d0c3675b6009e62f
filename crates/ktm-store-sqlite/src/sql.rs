//! Rendering of typed predicates into SQL `WHERE` clauses.
//!
//! Project predicates expect `projects p LEFT JOIN agencies a`; report
//! predicates expect `reports r`. Every needle is bound as a parameter and
//! compared against `fold(column)`, the SQL function registered by
//! [`SqliteStore`](crate::SqliteStore) on top of [`ktm_core::fold`].

use ktm_core::filter::{ProjectPredicate, ReportPredicate};
use rusqlite::types::Value;

use crate::encode::encode_uuid;

/// A conjunction of SQL conditions and their positional parameters.
#[derive(Debug, Default)]
pub struct Conditions {
  clauses: Vec<&'static str>,
  params:  Vec<Value>,
}

impl Conditions {
  pub fn projects(preds: &[ProjectPredicate]) -> Self {
    let mut c = Self::default();
    for pred in preds {
      match pred {
        ProjectPredicate::DistrictEq(d) => {
          c.clauses.push("fold(p.district) = ?");
          c.params.push(Value::Text(d.as_str().to_owned()));
        }
        ProjectPredicate::TextContains(q) => {
          c.clauses.push(
            "(instr(fold(p.title), ?) > 0 OR instr(fold(a.name), ?) > 0)",
          );
          c.params.push(Value::Text(q.as_str().to_owned()));
          c.params.push(Value::Text(q.as_str().to_owned()));
        }
        ProjectPredicate::HasTenderDate => {
          c.clauses.push("p.tender_date IS NOT NULL");
        }
      }
    }
    c
  }

  pub fn reports(preds: &[ReportPredicate]) -> Self {
    let mut c = Self::default();
    for pred in preds {
      match pred {
        ReportPredicate::DistrictEq(d) => {
          c.clauses.push("fold(r.district) = ?");
          c.params.push(Value::Text(d.as_str().to_owned()));
        }
        ReportPredicate::ProjectIdEq(id) => {
          c.clauses.push("r.project_id = ?");
          c.params.push(Value::Text(encode_uuid(*id)));
        }
      }
    }
    c
  }

  /// `WHERE a AND b ...`, or an empty string when there are no conditions.
  pub fn where_clause(&self) -> String {
    if self.clauses.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", self.clauses.join(" AND "))
    }
  }

  /// Append trailing parameters (e.g. `LIMIT ? OFFSET ?`) after the
  /// condition parameters.
  pub fn with_params(mut self, extra: impl IntoIterator<Item = Value>) -> Self {
    self.params.extend(extra);
    self
  }

  pub fn into_params(self) -> Vec<Value> { self.params }
}
