use diesel::sql_types::BigInt;

no_arg_sql_function!(
    last_insert_rowid,
    BigInt,
    "Row ID of the most recent successful insert on this connection."
);
