// Table query builder rendered into PostgREST query strings

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Gte => "gte",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    table: String,
    select: String,
    filters: Vec<Filter>,
    order: Option<(String, bool)>,
    limit: Option<usize>,
    count: bool,
}

impl Query {
    /// `select=*` on `table`
    pub fn from(table: &str) -> Self {
        Query {
            table: table.to_string(),
            select: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
            count: false,
        }
    }

    /// Columns to return; embedded resources may span several lines
    pub fn select(mut self, columns: &str) -> Self {
        self.select = columns.chars().filter(|c| !c.is_whitespace()).collect();
        self
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            op: FilterOp::Eq,
            value: value.to_string(),
        });
        self
    }

    pub fn gte(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            op: FilterOp::Gte,
            value: value.to_string(),
        });
        self
    }

    pub fn order(mut self, column: &str, desc: bool) -> Self {
        self.order = Some((column.to_string(), desc));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Ask for the exact row count (returned in Content-Range)
    pub fn count_exact(mut self) -> Self {
        self.count = true;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &str {
        &self.select
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn ordering(&self) -> Option<(&str, bool)> {
        self.order.as_ref().map(|(c, d)| (c.as_str(), *d))
    }

    pub fn row_limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn wants_count(&self) -> bool {
        self.count
    }

    /// Plain column names in the select list (`*` and embedded resources skipped)
    pub fn plain_columns(&self) -> Vec<&str> {
        let mut columns = Vec::new();
        let mut depth = 0usize;
        let mut start = 0usize;
        let bytes = self.select.as_bytes();

        for (i, b) in bytes.iter().enumerate() {
            match b {
                b'(' => depth += 1,
                b')' => depth = depth.saturating_sub(1),
                b',' if depth == 0 => {
                    columns.push(&self.select[start..i]);
                    start = i + 1;
                }
                _ => {}
            }
        }
        columns.push(&self.select[start..]);

        columns
            .into_iter()
            .filter(|c| !c.is_empty() && *c != "*" && !c.contains('('))
            .collect()
    }

    /// `table?select=...&col=op.value&order=col.desc&limit=n`
    pub fn to_path(&self) -> String {
        let mut params = Vec::new();
        params.push(format!("select={}", self.select));
        params.extend(self.filter_params());
        if let Some((column, desc)) = &self.order {
            params.push(format!(
                "order={}.{}",
                column,
                if *desc { "desc" } else { "asc" }
            ));
        }
        if let Some(limit) = self.limit {
            params.push(format!("limit={}", limit));
        }
        format!("{}?{}", self.table, params.join("&"))
    }

    /// Filters only; used for DELETE
    pub fn to_filter_path(&self) -> String {
        let params = self.filter_params();
        if params.is_empty() {
            self.table.clone()
        } else {
            format!("{}?{}", self.table, params.join("&"))
        }
    }

    fn filter_params(&self) -> Vec<String> {
        self.filters
            .iter()
            .map(|f| {
                format!(
                    "{}={}.{}",
                    f.column,
                    f.op.as_str(),
                    urlencoding::encode(&f.value)
                )
            })
            .collect()
    }
}
