//! oggscope - Ogg container and Theora header inspection
//!
//! The whole file is parsed from one in-memory buffer:
//! buffer -> pages -> logical bitstreams and packets -> Theora headers.
//! Records keep absolute byte offsets into the buffer so a viewer can
//! highlight exactly the bytes a field came from. Nothing is copied out of the
//! buffer except decoded comment strings.
//!
//! ```no_run
//! let data = std::fs::read("video.ogv").unwrap();
//! let inspection = oggscope::inspect(&data).unwrap();
//! for (serial, headers) in &inspection.theora {
//!     if let Some(ident) = &headers.identification {
//!         println!("{:08x}: {}x{}", serial, ident.picture_width, ident.picture_height);
//!     }
//! }
//! ```

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

pub mod error;
pub mod ogg;
pub mod theora;
pub mod utils;

pub use error::{Error, Result};
pub use ogg::{demux, parse_page, parse_pages, Bitstream, GranulePosition, OggPage, Packet};
pub use theora::{decode_headers, is_theora_bitstream, TheoraHeaders};

/// Everything decoded from one buffer.
#[derive(Debug, Clone, Serialize)]
pub struct Inspection<'a> {
    pub pages: Vec<OggPage<'a>>,
    pub bitstreams: BTreeMap<u32, Bitstream<'a>>,
    /// Headers of every bitstream whose first packet is a Theora header.
    pub theora: BTreeMap<u32, TheoraHeaders>,
}

/// Parse pages, demultiplex them and decode the headers of Theora bitstreams.
///
/// Fails only when a page cannot be parsed; header problems leave the
/// corresponding header slot empty.
pub fn inspect(buffer: &[u8]) -> Result<Inspection<'_>> {
    let pages = parse_pages(buffer)?;
    let bitstreams = demux(&pages);

    let theora = bitstreams
        .iter()
        .filter(|(_, bitstream)| is_theora_bitstream(bitstream))
        .map(|(&serial, bitstream)| (serial, decode_headers(bitstream)))
        .collect::<BTreeMap<_, _>>();

    debug!(
        pages = pages.len(),
        bitstreams = bitstreams.len(),
        theora = theora.len(),
        "inspected buffer"
    );

    Ok(Inspection {
        pages,
        bitstreams,
        theora,
    })
}
