// Generic SQL for every entity. Identifiers come from the entity's static
// column lists; only values are bound.

use sqlx::{PgConnection, Postgres, QueryBuilder};

use super::{
    entity::{Assignments, Entity, SqlValue},
    StoreError,
};

fn select<E: Entity>() -> QueryBuilder<'static, Postgres> {
    QueryBuilder::new(format!("SELECT {} FROM public.{}", E::COLUMNS.join(", "), E::TABLE))
}

fn push_value(builder: &mut QueryBuilder<'static, Postgres>, value: SqlValue) {
    match value {
        SqlValue::Text(value) => builder.push_bind(value),
        SqlValue::BigInt(value) => builder.push_bind(value),
        SqlValue::Timestamp(value) => builder.push_bind(value),
    };
}

fn push_where(builder: &mut QueryBuilder<'static, Postgres>, conditions: Assignments) {
    for (index, (column, value)) in conditions.into_iter().enumerate() {
        builder.push(if index == 0 { " WHERE " } else { " AND " });
        builder.push(column).push(" = ");
        push_value(builder, value);
    }
}

fn push_returning<E: Entity>(builder: &mut QueryBuilder<'static, Postgres>) {
    builder.push(" RETURNING ").push(E::COLUMNS.join(", "));
}

pub(crate) async fn get<E: Entity>(
    conn: &mut PgConnection,
    id: &E::Id,
) -> Result<Option<E>, StoreError> {
    let mut builder = select::<E>();
    push_where(&mut builder, vec![(E::ID_COLUMN, E::id_value(id))]);

    builder.build_query_as::<E>().fetch_optional(conn).await.map_err(map_sqlx_error::<E>)
}

pub(crate) async fn list<E: Entity>(
    conn: &mut PgConnection,
    offset: i64,
    limit: i64,
    sort: E::SortKey,
    filter: &E::Filter,
) -> Result<Vec<E>, StoreError> {
    let mut builder = select::<E>();
    push_where(&mut builder, E::filter_values(filter));
    builder.push(" ORDER BY ").push(E::sort_column(sort));
    if E::sort_column(sort) != E::ID_COLUMN {
        builder.push(", ").push(E::ID_COLUMN);
    }
    builder.push(" LIMIT ").push_bind(limit).push(" OFFSET ").push_bind(offset);

    builder.build_query_as::<E>().fetch_all(conn).await.map_err(map_sqlx_error::<E>)
}

pub(crate) async fn count<E: Entity>(
    conn: &mut PgConnection,
    filter: &E::Filter,
) -> Result<i64, StoreError> {
    let mut builder = QueryBuilder::new(format!("SELECT COUNT(*) FROM public.{}", E::TABLE));
    push_where(&mut builder, E::filter_values(filter));

    builder.build_query_scalar::<i64>().fetch_one(conn).await.map_err(map_sqlx_error::<E>)
}

pub(crate) async fn create<E: Entity>(
    conn: &mut PgConnection,
    new: &E::New,
) -> Result<E, StoreError> {
    let values = E::insert_values(new);
    let columns: Vec<&str> = values.iter().map(|(column, _)| *column).collect();

    let mut builder = QueryBuilder::new(format!(
        "INSERT INTO public.{} ({}) VALUES (",
        E::TABLE,
        columns.join(", ")
    ));
    for (index, (_, value)) in values.into_iter().enumerate() {
        if index > 0 {
            builder.push(", ");
        }
        push_value(&mut builder, value);
    }
    builder.push(")");
    push_returning::<E>(&mut builder);

    builder.build_query_as::<E>().fetch_one(conn).await.map_err(map_sqlx_error::<E>)
}

pub(crate) async fn update<E: Entity>(
    conn: &mut PgConnection,
    id: &E::Id,
    changes: &E::Changes,
) -> Result<E, StoreError> {
    let values = E::change_values(changes);
    if values.is_empty() {
        return get::<E>(conn, id).await?.ok_or_else(|| StoreError::not_found::<E>(id));
    }

    let mut builder = QueryBuilder::new(format!("UPDATE public.{} SET ", E::TABLE));
    for (index, (column, value)) in values.into_iter().enumerate() {
        if index > 0 {
            builder.push(", ");
        }
        builder.push(column).push(" = ");
        push_value(&mut builder, value);
    }
    push_where(&mut builder, vec![(E::ID_COLUMN, E::id_value(id))]);
    push_returning::<E>(&mut builder);

    builder
        .build_query_as::<E>()
        .fetch_optional(conn)
        .await
        .map_err(map_sqlx_error::<E>)?
        .ok_or_else(|| StoreError::not_found::<E>(id))
}

pub(crate) async fn delete<E: Entity>(
    conn: &mut PgConnection,
    id: &E::Id,
) -> Result<bool, StoreError> {
    let mut builder = QueryBuilder::new(format!("DELETE FROM public.{}", E::TABLE));
    push_where(&mut builder, vec![(E::ID_COLUMN, E::id_value(id))]);

    let result = builder.build().execute(conn).await.map_err(map_sqlx_error::<E>)?;
    Ok(result.rows_affected() > 0)
}

fn map_sqlx_error<E: Entity>(error: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(database_error) = &error {
        match database_error.code().as_deref() {
            Some("23505") => {
                return StoreError::Conflict(format!("{} already exists", E::NAME));
            }
            Some("23503") => {
                return StoreError::Conflict(format!(
                    "{} write violates a document reference: {}",
                    E::NAME,
                    database_error.message()
                ));
            }
            _ => {}
        }
    }

    StoreError::Database(error)
}
