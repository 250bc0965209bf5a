use serde_json::json;

/// Number of events requested per page while paginating.
pub const PAGE_SIZE: u32 = 1000;

/// Pool and coin filters for a trade query.
///
/// Coins filter both sides of a trade, so the arguments map onto an adapter's
/// three filter fields as `[pools, coins, coins]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterArgs {
    pub pools: Option<Vec<String>>,
    pub coins: Option<Vec<String>>,
}

impl FilterArgs {
    pub fn new(pools: Option<Vec<String>>, coins: Option<Vec<String>>) -> Self {
        Self { pools, coins }
    }

    fn positional(&self) -> [Option<&[String]>; 3] {
        let coins = self.coins.as_deref();
        [self.pools.as_deref(), coins, coins]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    fn as_str(self) -> &'static str {
        match self {
            OrderDirection::Asc => "asc",
            OrderDirection::Desc => "desc",
        }
    }
}

/// A trade query with its filters fixed; only page size, direction and cursor vary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradesQuery {
    object: String,
    where_args: String,
    fields: String,
}

impl TradesQuery {
    /// `filters` and `fields` are an adapter's field names; filters with no
    /// argument are left out of the `where` clause.
    pub fn new(object: &str, filters: &[&str], fields: &[&str], args: &FilterArgs) -> Self {
        let mut where_args = String::new();
        for (filter, values) in filters.iter().zip(args.positional()) {
            if let Some(values) = values {
                let list = json!(values).to_string().to_lowercase();
                where_args.push_str(&format!("{filter}_in: {list}, "));
            }
        }

        Self {
            object: object.to_string(),
            where_args,
            fields: fields.join(" "),
        }
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    /// The GraphQL document for up to `first` events with `timestamp > timestamp_gt`.
    pub fn render(&self, first: u32, direction: OrderDirection, timestamp_gt: i64) -> String {
        format!(
            "{{ {object}(first: {first}, orderBy: timestamp, orderDirection: {direction}, \
             where: {{ {where_args}timestamp_gt: {timestamp_gt} }}) {{ {fields} }} }}",
            object = self.object,
            direction = direction.as_str(),
            where_args = self.where_args,
            fields = self.fields,
        )
    }
}

/// The GraphQL document looking up the coins of one pool.
pub fn pool_coins_query(object: &str, filter: &str, fields: &str, pool: &str) -> String {
    format!(
        "{{ {object}(where: {{ {filter}: \"{}\" }}) {{ {fields} }} }}",
        pool.to_lowercase()
    )
}
