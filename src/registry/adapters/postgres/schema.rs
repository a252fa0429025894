//! Diesel schema for bot registry persistence.

diesel::table! {
    /// Registered bot definitions.
    bots (id) {
        /// Internal bot identifier.
        id -> Uuid,
        /// Unique bot name, also the code directory name.
        #[max_length = 100]
        name -> Varchar,
        /// Optional git remote.
        repo_url -> Nullable<Text>,
        /// Absolute code directory.
        code_path -> Text,
        /// Runtime tag (`python`, `node`).
        #[max_length = 50]
        runtime -> Varchar,
        /// Start command; empty selects the runtime default.
        start_command -> Text,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Environment variables owned by a bot.
    bot_env_vars (bot_id, key) {
        /// Owning bot.
        bot_id -> Uuid,
        /// Variable name, unique per bot.
        #[max_length = 255]
        key -> Varchar,
        /// Variable value.
        value -> Text,
        /// Insertion order within the bot's environment.
        position -> Int4,
    }
}

diesel::table! {
    /// Deployment attempt records.
    deployments (id) {
        /// Monotonic record identifier.
        id -> Int8,
        /// Owning bot.
        bot_id -> Uuid,
        /// Status (`pending`, `success`, `failed`).
        #[max_length = 20]
        status -> Varchar,
        /// Transcript chunks as a JSONB string array.
        transcript -> Jsonb,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Finalization timestamp.
        finalized_at -> Nullable<Timestamptz>,
    }
}
