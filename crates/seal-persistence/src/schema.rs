//! Esquema Diesel (declarado manualmente). Reemplazable con `diesel print-schema`.

diesel::table! {
    signed_records (key) {
        key -> Text,
        content -> Jsonb,
        signed_at -> Nullable<Timestamptz>,
        content_digest -> Nullable<Text>,
        previous_digest -> Nullable<Text>,
        chain_seq -> Nullable<BigInt>,
    }
}

diesel::table! {
    chain_head (id) {
        id -> Bool,
        head_digest -> Nullable<Text>,
        seq -> BigInt,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    signed_records,
    chain_head,
);
