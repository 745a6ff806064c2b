//! Request-time pipeline: payload model, interaction surface, dispatch, and
//! the webhook gateway.

pub mod dispatcher;
pub mod interaction;
pub mod server;
pub mod types;

pub use dispatcher::Dispatcher;
pub use interaction::{ReplyContent, RichReply, SlashCommandInteraction};
pub use server::{
    GatewayRequest, GatewayResponse, InteractionGateway, SignatureVerifier, SIGNATURE_HEADER,
    TIMESTAMP_HEADER,
};
pub use types::{CommandData, CommandDataOption, InteractionPayload, ReplyMessage, User};
