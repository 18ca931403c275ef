//! src/bin/client.rs
//!
//! One-shot admin client: builds a `ClientMessage` from CLI flags and sends
//! it over UDP to a running node's admin socket. Grounded in
//! `original_source/client/main.go`.

use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use peerster::codec::Codec;
use peerster::config::ClientCli;
use peerster::domain::ClientMessage;
use tokio::net::UdpSocket;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = ClientCli::parse();

    let message = ClientMessage {
        text: cli.msg,
        destination: cli.dest,
        file: cli.file,
        request: cli.request,
        peer: None,
    };

    let target: SocketAddr = format!("127.0.0.1:{}", cli.ui_port)
        .parse()
        .context("failed to build node admin address")?;

    let socket = UdpSocket::bind("127.0.0.1:0")
        .await
        .context("failed to bind client socket")?;
    let bytes = Codec::encode_client_message(&message).context("failed to encode message")?;
    socket
        .send_to(&bytes, target)
        .await
        .context("failed to send message to node")?;

    Ok(())
}
