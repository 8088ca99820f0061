//! Basic usage example for the framelink wire protocol.

use bytes::BytesMut;
use framelink_wire::{hex_dump, Frame, Handler, Message, RangeMsg, SampleMsg};

/// Prints every message it receives.
#[derive(Default)]
struct PrintHandler;

impl Handler for PrintHandler {
    fn handle_sample(&mut self, msg: SampleMsg) {
        println!(
            "   Sample arrived: mode {:?}, value {}",
            msg.reading().mode(),
            msg.reading().value()
        );
    }

    fn handle_range(&mut self, msg: RangeMsg) {
        println!(
            "   Range arrived: {} m ({} raw ticks)",
            msg.range().meters(),
            msg.range().value()
        );
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Framelink Wire Protocol Example ===\n");

    // 1. Build a sample message
    println!("1. Building a sample message...");
    let mut sample = SampleMsg::new();
    sample.reading_mut().set_wide();
    sample.reading_mut().set_value(3.14)?;
    println!("   Reading: {}", sample.reading().value());

    // 2. Frame it
    println!("\n2. Writing the frame...");
    let frame = Frame::new().with_checksum(true);
    let mut buf = BytesMut::new();
    frame.write_message(&sample, &mut buf)?;
    println!("   Wire bytes ({} total): {}", buf.len(), hex_dump(&buf));

    // 3. Add a second message to the same buffer
    println!("\n3. Queueing a range measurement behind it...");
    let mut range = RangeMsg::new();
    range.range_mut().set_meters(0.1);
    frame.write_message(&range, &mut buf)?;
    println!("   Buffer now holds {} bytes", buf.len());

    // 4. Process one frame per call
    println!("\n4. Processing the input data...");
    let mut handler = PrintHandler;
    frame.process_input_data(&mut buf, &mut handler)?;
    frame.process_input_data(&mut buf, &mut handler)?;
    println!("   Remaining bytes: {}", buf.len());

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
