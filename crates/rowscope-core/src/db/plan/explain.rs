use crate::db::{
    filter::OrderDirection,
    plan::{PlanNode, QueryPlan},
};

impl QueryPlan {
    /// Deterministic SQL-like rendering of the plan.
    ///
    /// Staged filters become a `WITH` chain of named views; unstaged filters,
    /// dedup, sort, and paging nest as aliased subqueries. The text is stable
    /// for equal plans and feeds the plan fingerprint.
    #[must_use]
    pub fn explain(&self) -> String {
        let mut renderer = Renderer::default();
        let body = match renderer.relation(self.root()) {
            Relation::Named(name) => format!("SELECT * FROM {name}"),
            Relation::Query(query) => query,
        };

        if renderer.views.is_empty() {
            return body;
        }

        let views = renderer
            .views
            .iter()
            .map(|(name, query)| format!("{name} AS ({query})"))
            .collect::<Vec<_>>()
            .join(",\n");

        format!("WITH {views}\n{body}")
    }
}

enum Relation {
    Named(String),
    Query(String),
}

#[derive(Default)]
struct Renderer {
    views: Vec<(&'static str, String)>,
    subqueries: usize,
}

impl Renderer {
    fn relation(&mut self, node: &PlanNode) -> Relation {
        match node {
            PlanNode::Scan { entity } => Relation::Named(entity.clone()),

            PlanNode::Filter {
                input,
                predicate,
                stage,
            } => {
                let source = self.source(input);
                let query = format!("SELECT * FROM {source} WHERE {predicate}");
                match stage {
                    Some(stage) => {
                        self.views.push((stage.view_name(), query));
                        Relation::Named(stage.view_name().to_string())
                    }
                    None => Relation::Query(query),
                }
            }

            PlanNode::Distinct {
                input,
                key,
                order,
                direction,
                tie_break,
            } => {
                let source = self.source(input);
                Relation::Query(format!(
                    "SELECT DISTINCT ON ({key}) * FROM {source} ORDER BY {key} ASC, {order} {direction} NULLS LAST, {tie_break} ASC",
                    key = key.name(),
                    order = order.name(),
                    tie_break = tie_break.name(),
                ))
            }

            PlanNode::Sort {
                input,
                column,
                direction,
                tie_break,
            } => {
                let source = self.source(input);
                // NULL sorts lowest
                let nulls = match direction {
                    OrderDirection::Asc => "NULLS FIRST",
                    OrderDirection::Desc => "NULLS LAST",
                };
                Relation::Query(format!(
                    "SELECT * FROM {source} ORDER BY {} {direction} {nulls}, {} ASC",
                    column.name(),
                    tie_break.name(),
                ))
            }

            PlanNode::Page {
                input,
                limit,
                offset,
            } => {
                let source = self.source(input);
                let mut query = format!("SELECT * FROM {source}");
                if let Some(limit) = limit {
                    query.push_str(&format!(" LIMIT {limit}"));
                }
                if *offset > 0 {
                    query.push_str(&format!(" OFFSET {offset}"));
                }
                Relation::Query(query)
            }

            PlanNode::Count { input } => {
                let source = self.source(input);
                Relation::Query(format!("SELECT count(*) FROM {source}"))
            }
        }
    }

    fn source(&mut self, node: &PlanNode) -> String {
        match self.relation(node) {
            Relation::Named(name) => name,
            Relation::Query(query) => {
                self.subqueries += 1;
                format!("({query}) AS q{}", self.subqueries)
            }
        }
    }
}
