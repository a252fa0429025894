//! Application services for the bot registry.

mod catalog;

pub use catalog::{
    BotCatalogService, BotCatalogServiceError, BotCatalogServiceResult, CreateBotRequest,
    UpdateBotRequest,
};
