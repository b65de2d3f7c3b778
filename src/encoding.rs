use crate::constants::Command;

impl Command {
    /// Literal CRLF terminated line sent to the scale for this command.
    pub fn encode(self) -> &'static str {
        match self {
            Command::Id => "?ID\r\n",
            Command::SerialNumber => "?SN\r\n",
            Command::ModelNumber => "?TN\r\n",
            Command::TareWeight => "?PT\r\n",
            Command::CalButton => "CAL\r\n",
            Command::OffButton => "OFF\r\n",
            Command::OnButton => "ON\r\n",
            Command::OnOffButton => "P\r\n",
            Command::PrintButton => "PRT\r\n",
            Command::RezeroButton => "R\r\n",
            Command::SampleButton => "SMP\r\n",
            Command::ModeButton => "U\r\n",
        }
    }

    pub fn as_bytes(self) -> &'static [u8] {
        self.encode().as_bytes()
    }

    /// Maps a written line back to its command, ignoring the terminator.
    pub fn from_line(line: &str) -> Option<Command> {
        let line = line.trim();
        Command::ALL
            .into_iter()
            .find(|cmd| cmd.encode().trim_end() == line)
    }
}
