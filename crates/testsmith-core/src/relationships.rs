//! Relationships between operations, used by workflow test cases.

use serde::Serialize;

use crate::catalog::{HttpMethod, Operation, OperationRef};
use crate::classifier::{classify, Component};

/// Upper bound on recorded resource-family sequences.
pub const MAX_SEQUENCES: usize = 10;

/// CRUD verbs present on one component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrudGroup {
    pub component: Component,
    /// Distinct methods in first-seen order.
    pub methods: Vec<HttpMethod>,
    pub operations: Vec<OperationRef>,
}

impl CrudGroup {
    fn verb_count(&self) -> usize {
        let has = |m: &[HttpMethod]| self.methods.iter().any(|x| m.contains(x));
        [
            has(&[HttpMethod::Post]),
            has(&[HttpMethod::Get]),
            has(&[HttpMethod::Put, HttpMethod::Patch]),
            has(&[HttpMethod::Delete]),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }

    /// `POST, GET, DELETE` style list for descriptions.
    pub fn method_list(&self) -> String {
        self.methods
            .iter()
            .map(HttpMethod::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Two operations on the same resource family with different methods.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceSequence {
    pub family: String,
    pub first: OperationRef,
    pub second: OperationRef,
}

impl ResourceSequence {
    /// `POST_then_GET`.
    pub fn sequence_type(&self) -> String {
        format!("{}_then_{}", self.first.method, self.second.method)
    }

    fn involves(&self, operation: &Operation) -> bool {
        [&self.first, &self.second]
            .into_iter()
            .any(|r| r.method == operation.method && r.path == operation.path)
    }

    /// The other side of the pair, if `operation` is part of it.
    pub fn partner_of(&self, operation: &Operation) -> Option<&OperationRef> {
        if !self.involves(operation) {
            return None;
        }
        if self.first.method == operation.method && self.first.path == operation.path {
            Some(&self.second)
        } else {
            Some(&self.first)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApiRelationships {
    pub crud_groups: Vec<CrudGroup>,
    pub sequences: Vec<ResourceSequence>,
}

impl ApiRelationships {
    pub fn crud_group(&self, component: &Component) -> Option<&CrudGroup> {
        self.crud_groups.iter().find(|g| &g.component == component)
    }

    pub fn sequence_for(&self, operation: &Operation) -> Option<&ResourceSequence> {
        self.sequences.iter().find(|s| s.involves(operation))
    }
}

/// Find CRUD groups (components with at least two of create/read/update/delete)
/// and the first [`MAX_SEQUENCES`] resource-family pairs, in catalog order.
pub fn analyze(operations: &[Operation]) -> ApiRelationships {
    let mut groups: Vec<CrudGroup> = Vec::new();
    for operation in operations {
        let component = classify(operation);
        let group = match groups.iter_mut().position(|g| g.component == component) {
            Some(index) => &mut groups[index],
            None => {
                groups.push(CrudGroup {
                    component,
                    methods: Vec::new(),
                    operations: Vec::new(),
                });
                let last = groups.len() - 1;
                &mut groups[last]
            }
        };
        if !group.methods.contains(&operation.method) {
            group.methods.push(operation.method);
        }
        group.operations.push(operation.reference());
    }
    groups.retain(|g| g.verb_count() >= 2);

    let mut sequences = Vec::new();
    'outer: for (i, first) in operations.iter().enumerate() {
        let Some(family) = first_segment(&first.path) else {
            continue;
        };
        for second in &operations[i + 1..] {
            if sequences.len() >= MAX_SEQUENCES {
                break 'outer;
            }
            if first.method != second.method && first_segment(&second.path) == Some(family) {
                sequences.push(ResourceSequence {
                    family: family.to_string(),
                    first: first.reference(),
                    second: second.reference(),
                });
            }
        }
    }

    ApiRelationships {
        crud_groups: groups,
        sequences,
    }
}

fn first_segment(path: &str) -> Option<&str> {
    path.split('/').find(|segment| !segment.is_empty())
}
