//! Checkpoint I/O
//!
//! Saves and restores a [`Decoder`] through a small self-describing binary
//! format, so a model initialized and inspected in one process can be
//! reloaded in another without re-running the seeded init.
//!
//! ## Wire Format
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │ magic          "MYNAH_CKPT"          10 bytes │
//! │ version                               1 byte  │
//! │ config JSON length                   u32 LE   │
//! │ config JSON                          N bytes  │
//! │ weights, fixed order (see below)              │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! Each tensor record is `rank: u32` (at most 2), the dims as `u32`s,
//! `len: u32`, then the values as little-endian `f32`s. A linear layer is its
//! weight tensor followed by one flag byte and, when the flag is 1, the bias
//! tensor.
//!
//! Weight order: token embedding, position embedding, block count as `u32`,
//! then per block ln1 gamma/beta, each head's q/k/v projections, the output
//! projection, ln2 gamma/beta, fc1, fc2; finally the last layer norm's
//! gamma/beta and the vocabulary projection.

use std::fs::File;
use std::io::{Read, Write};

use crate::config::Config;
use crate::layers::{
    AttentionHead, Block, Dropout, FeedForward, LayerNorm, Linear, MultiHeadAttention,
};
use crate::model::{Decoder, Embedding};
use crate::tensor::Tensor;

/// First ten bytes of every checkpoint file.
pub const CHECKPOINT_MAGIC: &[u8; 10] = b"MYNAH_CKPT";

/// Format version written after the magic.
pub const CHECKPOINT_VERSION: u8 = 1;

fn write_tensor(file: &mut File, tensor: &Tensor) -> std::io::Result<()> {
    file.write_all(&(tensor.shape.len() as u32).to_le_bytes())?;
    for &dim in &tensor.shape {
        file.write_all(&(dim as u32).to_le_bytes())?;
    }
    file.write_all(&(tensor.data.len() as u32).to_le_bytes())?;
    for &val in &tensor.data {
        file.write_all(&val.to_le_bytes())?;
    }
    Ok(())
}

fn read_tensor(file: &mut File) -> std::io::Result<Tensor> {
    let mut rank_bytes = [0u8; 4];
    file.read_exact(&mut rank_bytes)?;
    let rank = u32::from_le_bytes(rank_bytes) as usize;

    // Weights are 2-D and biases 1-D, so any higher rank is corruption.
    if rank > 2 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Tensor rank {} exceeds the format maximum of 2", rank),
        ));
    }

    let mut shape = Vec::with_capacity(rank);
    for _ in 0..rank {
        let mut dim_bytes = [0u8; 4];
        file.read_exact(&mut dim_bytes)?;
        shape.push(u32::from_le_bytes(dim_bytes) as usize);
    }

    let mut len_bytes = [0u8; 4];
    file.read_exact(&mut len_bytes)?;
    let len = u32::from_le_bytes(len_bytes) as usize;

    if len != shape.iter().product::<usize>() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Tensor length {} does not match shape {:?}", len, shape),
        ));
    }

    let mut data = Vec::with_capacity(len);
    for _ in 0..len {
        let mut val_bytes = [0u8; 4];
        file.read_exact(&mut val_bytes)?;
        data.push(f32::from_le_bytes(val_bytes));
    }

    Ok(Tensor::new(data, shape))
}

fn write_linear(file: &mut File, linear: &Linear) -> std::io::Result<()> {
    write_tensor(file, &linear.weight)?;
    file.write_all(&[linear.bias.is_some() as u8])?;
    if let Some(bias) = &linear.bias {
        write_tensor(file, bias)?;
    }
    Ok(())
}

fn read_linear(file: &mut File) -> std::io::Result<Linear> {
    let weight = read_tensor(file)?;

    let mut has_bias = [0u8; 1];
    file.read_exact(&mut has_bias)?;
    let bias = if has_bias[0] == 1 {
        Some(read_tensor(file)?)
    } else {
        None
    };

    Ok(Linear { weight, bias })
}

impl Decoder {
    /// Save the model weights and config to a binary checkpoint file.
    pub fn save_checkpoint(&self, path: &str) -> std::io::Result<()> {
        println!("💾 Saving checkpoint to {}...", path);

        let mut file = File::create(path)?;

        // Header and version
        file.write_all(CHECKPOINT_MAGIC)?;
        file.write_all(&[CHECKPOINT_VERSION])?;

        // Config as length-prefixed JSON
        let config_json = serde_json::to_string(&self.config)?;
        let config_bytes = config_json.as_bytes();
        file.write_all(&(config_bytes.len() as u32).to_le_bytes())?;
        file.write_all(config_bytes)?;

        // Weights in fixed order
        write_tensor(&mut file, &self.token_embedding.weight)?;
        write_tensor(&mut file, &self.position_embedding.weight)?;

        file.write_all(&(self.blocks.len() as u32).to_le_bytes())?;
        for block in &self.blocks {
            write_tensor(&mut file, &block.ln1.gamma)?;
            write_tensor(&mut file, &block.ln1.beta)?;

            for head in &block.attn.heads {
                write_linear(&mut file, &head.wq)?;
                write_linear(&mut file, &head.wk)?;
                write_linear(&mut file, &head.wv)?;
            }
            write_linear(&mut file, &block.attn.out_proj)?;

            write_tensor(&mut file, &block.ln2.gamma)?;
            write_tensor(&mut file, &block.ln2.beta)?;

            write_linear(&mut file, &block.mlp.fc1)?;
            write_linear(&mut file, &block.mlp.fc2)?;
        }

        write_tensor(&mut file, &self.ln_f.gamma)?;
        write_tensor(&mut file, &self.ln_f.beta)?;
        write_linear(&mut file, &self.lm_head)?;

        let file_size = file.metadata()?.len() as f64 / 1_000_000.0;
        println!("✅ Checkpoint saved successfully!");
        println!("   File size: {:.2} MB", file_size);
        println!("   Parameters: {}", self.count_parameters());

        Ok(())
    }

    /// Load a model from a checkpoint file written by [`save_checkpoint`].
    ///
    /// The header, version, config and block count are all validated before
    /// any weights are accepted.
    ///
    /// [`save_checkpoint`]: Decoder::save_checkpoint
    pub fn load_checkpoint(path: &str) -> std::io::Result<Decoder> {
        println!("📂 Loading checkpoint from {}...", path);

        let mut file = File::open(path)?;

        // Verify header
        let mut magic = [0u8; 10];
        file.read_exact(&mut magic)?;
        if &magic != CHECKPOINT_MAGIC {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "Invalid checkpoint header - expected MYNAH_CKPT",
            ));
        }

        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != CHECKPOINT_VERSION {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Unsupported checkpoint version: {}", version[0]),
            ));
        }

        // Config
        let mut config_len_bytes = [0u8; 4];
        file.read_exact(&mut config_len_bytes)?;
        let config_len = u32::from_le_bytes(config_len_bytes) as usize;

        let mut config_bytes = vec![0u8; config_len];
        file.read_exact(&mut config_bytes)?;
        let config_json = String::from_utf8(config_bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let config: Config = serde_json::from_str(&config_json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        config
            .validate()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        // Weights
        let token_embedding = Embedding {
            weight: read_tensor(&mut file)?,
        };
        let position_embedding = Embedding {
            weight: read_tensor(&mut file)?,
        };

        let mut num_blocks_bytes = [0u8; 4];
        file.read_exact(&mut num_blocks_bytes)?;
        let num_blocks = u32::from_le_bytes(num_blocks_bytes) as usize;
        if num_blocks != config.n_layer {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "Checkpoint has {} blocks but config expects {}",
                    num_blocks, config.n_layer
                ),
            ));
        }

        let mut blocks = Vec::with_capacity(num_blocks);
        for _ in 0..num_blocks {
            let ln1 = LayerNorm {
                gamma: read_tensor(&mut file)?,
                beta: read_tensor(&mut file)?,
                eps: 1e-5,
            };

            let mut heads = Vec::with_capacity(config.n_head);
            for _ in 0..config.n_head {
                heads.push(AttentionHead {
                    wq: read_linear(&mut file)?,
                    wk: read_linear(&mut file)?,
                    wv: read_linear(&mut file)?,
                    dropout: Dropout::new(config.dropout),
                    head_size: config.head_size(),
                });
            }
            let attn = MultiHeadAttention {
                heads,
                out_proj: read_linear(&mut file)?,
                dropout: Dropout::new(config.dropout),
                d_model: config.d_model,
            };

            let ln2 = LayerNorm {
                gamma: read_tensor(&mut file)?,
                beta: read_tensor(&mut file)?,
                eps: 1e-5,
            };

            let mlp = FeedForward {
                fc1: read_linear(&mut file)?,
                fc2: read_linear(&mut file)?,
                dropout: Dropout::new(config.dropout),
            };

            blocks.push(Block {
                ln1,
                attn,
                ln2,
                mlp,
            });
        }

        let ln_f = LayerNorm {
            gamma: read_tensor(&mut file)?,
            beta: read_tensor(&mut file)?,
            eps: 1e-5,
        };
        let lm_head = read_linear(&mut file)?;

        let model = Decoder {
            config,
            token_embedding,
            position_embedding,
            blocks,
            ln_f,
            lm_head,
        };

        println!("✅ Checkpoint loaded successfully!");
        println!(
            "   {} layers, {} heads, vocab {} ({} parameters)",
            model.config.n_layer,
            model.config.n_head,
            model.config.vocab_size,
            model.count_parameters()
        );

        Ok(model)
    }
}
