use std::io::{Result, Write};

use crossterm::{cursor, terminal, ExecutableCommand};

use shared_resources::elevator_status::FleetSnapshot;

const HEADER_SIZE: u16 = 5;

/// Redraws a table of the fleet in place on every call.
pub struct Debug<W: Write> {
    out: W,
    lines_drawn: u16,
}

impl<W: Write> Debug<W> {
    pub fn new(out: W) -> Self {
        Debug { out, lines_drawn: 0 }
    }

    pub fn printstatus(&mut self, snapshot: &FleetSnapshot) -> Result<()> {
        if self.lines_drawn > 0 {
            self.out.execute(cursor::MoveUp(self.lines_drawn))?;
        }
        self.out.execute(terminal::Clear(terminal::ClearType::FromCursorDown))?;

        writeln!(self.out, "+--------------------------------------------------------+")?;
        writeln!(self.out, "| ELEVATOR FLEET                                         |")?;
        writeln!(self.out, "+------------+------------+------------+------------------+")?;
        writeln!(self.out, "| {0:<10} | {1:<10} | {2:<10} | {3:<16} |", "ID", "STATE", "FLOOR", "GOAL")?;
        writeln!(self.out, "+------------+------------+------------+------------------+")?;
        let mut lines = HEADER_SIZE;
        for status in &snapshot.statuses {
            let goal = status
                .direction
                .goal()
                .map_or(String::from("-"), |goal| goal.to_string());
            writeln!(
                self.out,
                "| {0:<10} | {1:<10} | {2:<10} | {3:<16} |",
                status.id,
                status.direction.as_string(),
                status.direction.floor(),
                goal
            )?;
            writeln!(self.out, "+------------+------------+------------+------------------+")?;
            lines += 2;
        }
        if !snapshot.is_complete() {
            writeln!(self.out, "| NO ANSWER FROM {:<39} |", format!("{:?}", snapshot.missing))?;
            lines += 1;
        }
        self.out.flush()?;
        self.lines_drawn = lines;
        Ok(())
    }
}
