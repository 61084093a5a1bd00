/// A composable match/insert clause pair.
///
/// Match clauses bind variables for already-persisted nodes; insert clauses
/// may reference those variables, so when fragments are concatenated every
/// match fragment must precede the insert fragments that use its bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub match_clause: String,
    pub insert_clause: String,
}

impl Fragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.match_clause.is_empty() && self.insert_clause.is_empty()
    }

    /// Append another fragment, keeping match and insert sides separate.
    pub fn append(&mut self, other: Fragment) {
        self.match_clause.push_str(&other.match_clause);
        self.insert_clause.push_str(&other.insert_clause);
    }

    /// Assemble the final write query.
    ///
    /// Returns `None` when there is nothing to insert (the record translated
    /// to an empty body, e.g. an already-bootstrapped marking).
    pub fn to_query(&self) -> Option<String> {
        if self.insert_clause.trim().is_empty() {
            return None;
        }
        if self.match_clause.trim().is_empty() {
            Some(format!("insert\n{}", self.insert_clause))
        } else {
            Some(format!(
                "match\n{}insert\n{}",
                self.match_clause, self.insert_clause
            ))
        }
    }
}

/// Where one generated property variable came from.
///
/// Scoped to one record's translation; marking selectors use these to
/// address a variable an earlier sub-translator generated, without
/// recomputing it. `index` is `Some` for one element of a multi-valued
/// property, `None` for a single-valued occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableBinding {
    pub field: String,
    pub index: Option<usize>,
    pub var: String,
}

/// Output of object translation, input to the layering engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyDescriptor {
    /// The record's stix-id.
    pub id: String,
    /// The record's kind tag.
    pub kind: String,
    /// Raw ids this record references; drives layer placement.
    pub dep_ids: Vec<String>,
    pub fragment: Fragment,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_without_match_omits_the_match_keyword() {
        let fragment = Fragment {
            match_clause: String::new(),
            insert_clause: " $identity isa identity;\n".to_string(),
        };
        assert_eq!(
            fragment.to_query().unwrap(),
            "insert\n $identity isa identity;\n"
        );
    }

    #[test]
    fn query_with_match_puts_match_before_insert() {
        let fragment = Fragment {
            match_clause: " $identity0 isa identity, has stix-id \"identity--a\";\n".to_string(),
            insert_clause: " $indicator isa indicator;\n".to_string(),
        };
        let query = fragment.to_query().unwrap();
        assert!(query.starts_with("match\n"));
        assert!(query.contains("insert\n $indicator"));
    }

    #[test]
    fn empty_insert_yields_no_query() {
        assert_eq!(Fragment::new().to_query(), None);
    }
}
