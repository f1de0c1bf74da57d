pub mod manifest_decoder;
