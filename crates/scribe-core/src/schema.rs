// Diesel table definitions. pgvector columns are declared with
// `pgvector::sql_types::Vector`; raw SQL (see `db::embeddings`) is used for
// the cosine-distance queries Diesel's query builder can't express.

use diesel::sql_types::*;
use pgvector::sql_types::Vector;

diesel::table! {
    use diesel::sql_types::*;

    scripts (id) {
        id -> Uuid,
        title -> Text,
        owner_id -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    scenes (id) {
        id -> Uuid,
        script_id -> Uuid,
        position -> Int4,
        heading -> Text,
        content -> Text,
        word_count -> Int4,
        characters -> Array<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    scene_summaries (scene_id) {
        scene_id -> Uuid,
        script_id -> Uuid,
        summary -> Text,
        is_stale -> Bool,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    use diesel::sql_types::*;
    use pgvector::sql_types::Vector;

    scene_embeddings (scene_id) {
        scene_id -> Uuid,
        script_id -> Uuid,
        embedding -> Nullable<Vector>,
        is_key_scene -> Bool,
        act -> Nullable<Int4>,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    script_outlines (script_id) {
        script_id -> Uuid,
        content -> Jsonb,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    character_sheets (script_id, name_normalized) {
        script_id -> Uuid,
        name_normalized -> Text,
        arc -> Nullable<Text>,
        relationships -> Jsonb,
        appearance_count -> Int4,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    plot_threads (id) {
        id -> Uuid,
        script_id -> Uuid,
        name -> Text,
        thread_type -> Text,
        scene_positions -> Array<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    scene_relationships (id) {
        id -> Uuid,
        script_id -> Uuid,
        setup_position -> Int4,
        payoff_position -> Int4,
        relationship_type -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    chat_conversations (id) {
        id -> Uuid,
        script_id -> Uuid,
        user_id -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    chat_messages (id) {
        id -> Uuid,
        conversation_id -> Uuid,
        role -> Text,
        content -> Text,
        sequence_id -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    conversation_summaries (id) {
        id -> Uuid,
        conversation_id -> Uuid,
        covered_through_sequence_id -> Int8,
        content -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    working_sets (conversation_id) {
        conversation_id -> Uuid,
        active_scene_positions -> Array<Int4>,
        active_characters -> Array<Text>,
        active_threads -> Array<Text>,
        last_user_intent -> Nullable<Text>,
        last_assistant_commitment -> Nullable<Text>,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    token_usage_rows (id) {
        id -> Uuid,
        conversation_id -> Uuid,
        input_tokens -> Int8,
        cache_creation_tokens -> Int8,
        cache_read_tokens -> Int8,
        output_tokens -> Int8,
        cost_minor_units -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    background_jobs (id) {
        id -> Uuid,
        job_type -> Text,
        dedup_key -> Text,
        payload -> Jsonb,
        status -> Text,
        run_at -> Timestamptz,
        created_at -> Timestamptz,
        last_error -> Nullable<Text>,
    }
}

diesel::joinable!(chat_messages -> chat_conversations (conversation_id));
diesel::joinable!(working_sets -> chat_conversations (conversation_id));
diesel::joinable!(scenes -> scripts (script_id));
diesel::joinable!(scene_summaries -> scripts (script_id));
diesel::joinable!(scene_embeddings -> scripts (script_id));

diesel::allow_tables_to_appear_in_same_query!(
    scripts,
    scenes,
    scene_summaries,
    scene_embeddings,
    script_outlines,
    character_sheets,
    plot_threads,
    scene_relationships,
    chat_conversations,
    chat_messages,
    conversation_summaries,
    working_sets,
    token_usage_rows,
    background_jobs,
);
