pub mod identity_server;
