/*!
 * Provider implementation for the AI text service.
 *
 * This module contains the client implementation for the OpenAI chat
 * completions API; OpenAI-compatible endpoints (Azure, self-hosted
 * gateways) are reached through the same client.
 */

pub mod openai;
