use tscan_cache::{select, update, CacheConnection, Operator, PredicateSet, QueryBuilder, SortDirection};

fn main() -> tscan_cache::Result<()> {
    tscan_cache::init_logging("tscan_cache=debug");

    // SELECT with predicates from several operators
    let recent = QueryBuilder::new()
        .select_columns("entries", ("path", "size"))
        .greater_than("size", 1024)?
        .not_like("path", "%.tmp")?
        .set_in("kind", vec!["file", "symlink"])?
        .order_by("size", SortDirection::Desc)?
        .limit(20)?;

    let statement = recent.build()?;
    println!("SQL:     {}", statement.sql());
    println!("Params:  {:?}", statement.params());
    println!("Preview: {}", recent.preview());

    // Reusable predicate fragments
    let stale = PredicateSet::new().with(Operator::LessThan, "expires_at", 1_700_000_000);
    let refresh = update("entries").set([("expires_at", 0)])?.where_([&stale])?;
    println!("UPDATE:  {}", refresh.preview());

    // Assembly errors never escape preview()
    println!("Broken:  {}", QueryBuilder::new().preview());

    let dir = std::env::temp_dir();
    let mut cache = CacheConnection::in_cache_dir(&dir);
    let count = cache.scope(|conn| {
        conn.connection()?
            .execute_batch("CREATE TABLE IF NOT EXISTS entries (path TEXT, size INTEGER, kind TEXT, expires_at INTEGER);")?;
        let rows = conn.cursor()?.fetch_rows(&select("entries").build()?)?;
        Ok(rows.len())
    })?;
    println!("Cached entries in {}: {}", cache.path().display(), count);

    Ok(())
}
