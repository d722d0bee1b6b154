//! Dynamic SQL construction for filtered, paginated list endpoints.

use sqlx::query::{QueryAs, QueryScalar};
use sqlx::{Postgres, QueryBuilder};

/// Builder for list queries: optional filters, search, ordering, pagination.
///
/// Filters are only appended when a value is present, so handlers can chain
/// every supported query parameter unconditionally:
///
/// ```ignore
/// let mut query = ListQuery::new("SELECT * FROM appointments a");
/// query
///     .filter_eq("a.status", params.status.as_deref().map(str::to_owned))
///     .filter_eq("a.doctor_id", params.doctor_id)
///     .search(&["a.reason", "a.notes"], params.search.as_deref())
///     .order_by("a.date_time", "DESC")
///     .paginate(params.pagination.page(), params.pagination.page_size());
/// let rows: Vec<AppointmentRow> = query.build_query_as().fetch_all(&pool).await?;
/// ```
pub struct ListQuery<'a> {
    query: QueryBuilder<'a, Postgres>,
    has_where: bool,
}

impl<'a> ListQuery<'a> {
    /// Start from a base statement without a WHERE clause.
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            query: QueryBuilder::new(base.into()),
            has_where: false,
        }
    }

    fn push_clause(&mut self) {
        if self.has_where {
            self.query.push(" AND ");
        } else {
            self.query.push(" WHERE ");
            self.has_where = true;
        }
    }

    /// Append an equality filter when `value` is present.
    pub fn filter_eq<T>(&mut self, column: &str, value: Option<T>) -> &mut Self
    where
        T: for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Send + Sync + 'static,
    {
        if let Some(value) = value {
            self.push_clause();
            self.query.push(column);
            self.query.push(" = ");
            self.query.push_bind(value);
        }
        self
    }

    /// Append an unconditional equality filter.
    pub fn filter_eq_required<T>(&mut self, column: &str, value: T) -> &mut Self
    where
        T: for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Send + Sync + 'static,
    {
        self.push_clause();
        self.query.push(column);
        self.query.push(" = ");
        self.query.push_bind(value);
        self
    }

    /// Case-insensitive substring search over any of the given columns.
    pub fn search(&mut self, columns: &[&str], term: Option<&str>) -> &mut Self {
        let Some(term) = term.map(str::trim).filter(|t| !t.is_empty()) else {
            return self;
        };
        let pattern = format!("%{term}%");
        self.push_clause();
        self.query.push("(");
        for (index, column) in columns.iter().enumerate() {
            if index > 0 {
                self.query.push(" OR ");
            }
            self.query.push(*column);
            self.query.push(" ILIKE ");
            self.query.push_bind(pattern.clone());
        }
        self.query.push(")");
        self
    }

    /// Append a half-open time-window filter (`start <= column < end`).
    pub fn filter_window<T>(&mut self, column: &str, window: Option<(T, T)>) -> &mut Self
    where
        T: for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Send + Sync + 'static,
    {
        if let Some((start, end)) = window {
            self.push_clause();
            self.query.push(column);
            self.query.push(" >= ");
            self.query.push_bind(start);
            self.query.push(" AND ");
            self.query.push(column);
            self.query.push(" < ");
            self.query.push_bind(end);
        }
        self
    }

    /// Append an ORDER BY clause. `column` and `direction` must be literals
    /// controlled by the handler, never user input.
    pub fn order_by(&mut self, column: &str, direction: &str) -> &mut Self {
        self.query.push(" ORDER BY ");
        self.query.push(column);
        self.query.push(" ");
        self.query.push(direction);
        self
    }

    /// Apply LIMIT/OFFSET from already-clamped pagination values.
    pub fn paginate(&mut self, page: u32, page_size: u32) -> &mut Self {
        let offset = i64::from((page.max(1) - 1) * page_size);
        self.query.push(" LIMIT ");
        self.query.push_bind(i64::from(page_size));
        self.query.push(" OFFSET ");
        self.query.push_bind(offset);
        self
    }

    /// Build a typed row query.
    pub fn build_query_as<T>(&mut self) -> QueryAs<'_, Postgres, T, sqlx::postgres::PgArguments>
    where
        T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow>,
    {
        self.query.build_query_as()
    }

    /// Build a single-column query (COUNT and friends).
    pub fn build_query_scalar<T>(
        &mut self,
    ) -> QueryScalar<'_, Postgres, T, sqlx::postgres::PgArguments>
    where
        (T,): for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow>,
    {
        self.query.build_query_scalar()
    }

    /// Rendered SQL so far (used by tests).
    pub fn sql(&self) -> &str {
        self.query.sql()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn first_filter_opens_the_where_clause() {
        let mut query = ListQuery::new("SELECT * FROM patients");
        query
            .filter_eq("gender", Some("female".to_string()))
            .filter_eq("blood_group", Some("A+".to_string()));
        let sql = query.sql();
        assert!(sql.contains("WHERE gender = "));
        assert!(sql.contains("AND blood_group = "));
    }

    #[test]
    fn absent_filters_leave_the_query_untouched() {
        let mut query = ListQuery::new("SELECT * FROM patients");
        query
            .filter_eq("gender", None::<String>)
            .search(&["first_name"], None)
            .filter_window("created_at", None::<(i64, i64)>);
        assert_eq!(query.sql(), "SELECT * FROM patients");
    }

    #[test]
    fn search_spans_all_columns() {
        let mut query = ListQuery::new("SELECT * FROM patients");
        query.search(&["first_name", "last_name", "email"], Some("smith"));
        let sql = query.sql();
        assert!(sql.contains("first_name ILIKE "));
        assert!(sql.contains(" OR last_name ILIKE "));
        assert!(sql.contains(" OR email ILIKE "));
    }

    #[test]
    fn blank_search_terms_are_ignored() {
        let mut query = ListQuery::new("SELECT * FROM patients");
        query.search(&["first_name"], Some("   "));
        assert_eq!(query.sql(), "SELECT * FROM patients");
    }

    #[test]
    fn window_is_half_open() {
        let mut query = ListQuery::new("SELECT COUNT(*) FROM appointments");
        query.filter_window("date_time", Some((0_i64, 10_i64)));
        let sql = query.sql();
        assert!(sql.contains("date_time >= "));
        assert!(sql.contains("date_time < "));
    }

    #[test]
    fn pagination_appends_limit_and_offset() {
        let mut query = ListQuery::new("SELECT * FROM bills");
        query
            .filter_eq("patient_id", Some(Uuid::new_v4()))
            .order_by("created_at", "DESC")
            .paginate(3, 25);
        let sql = query.sql();
        assert!(sql.contains("ORDER BY created_at DESC"));
        assert!(sql.contains("LIMIT "));
        assert!(sql.contains("OFFSET "));
    }
}
