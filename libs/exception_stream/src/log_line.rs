use std::fmt;
use std::str::FromStr;

use crate::Result;
use crate::error::Error;
use crate::node::ExceptionNode;

/// One line of an exception log file.
///
/// Formats as `<reserved>,<app name> - <app version>,<machine>,<user>,<pid>,<unix time>,<hex stream>`.
/// Commas in the free text fields are written as periods so the line can be
/// split again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogLine {
    pub reserved: String,
    pub app_name: String,
    pub app_version: String,
    pub machine_name: String,
    pub user_name: String,
    pub pid: u32,
    pub unix_time: i64,
    /// The exception chain in hex text form.
    pub stream: String,
}

impl LogLine {
    /// Builds a log line for `node` from its context.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the node cannot be serialized.
    pub fn from_node(node: &ExceptionNode) -> Result<Self> {
        let context = node.context();
        Ok(Self {
            reserved: String::new(),
            app_name: context.app_name.clone(),
            app_version: context.app_version.clone(),
            machine_name: context.machine_name.clone(),
            user_name: context.user_name.clone(),
            pid: context.pid,
            unix_time: byte_stream::datetime::to_ctime(context.exception_time),
            stream: node.to_hex()?,
        })
    }

    /// Decodes the exception chain stored in the line.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the stream is not a valid exception.
    pub fn decode(&self) -> Result<ExceptionNode> {
        ExceptionNode::from_hex(&self.stream)
    }
}

struct Field<'a>(&'a str);

impl fmt::Display for Field<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, part) in self.0.split(',').enumerate() {
            if index != 0 {
                f.write_str(".")?;
            }

            f.write_str(part)?;
        }

        Ok(())
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{} - {},{},{},{},{},{}",
            Field(&self.reserved),
            Field(&self.app_name),
            Field(&self.app_version),
            Field(&self.machine_name),
            Field(&self.user_name),
            self.pid,
            self.unix_time,
            self.stream,
        )
    }
}

impl FromStr for LogLine {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim_end_matches(['\r', '\n']).splitn(7, ',');
        let mut next = |name| parts.next().ok_or(Error::LogLine(name));

        let reserved = next("missing reserved field")?;
        let app = next("missing application field")?;
        let machine_name = next("missing machine field")?;
        let user_name = next("missing user field")?;
        let pid = next("missing process id")?;
        let unix_time = next("missing time")?;
        let stream = next("missing exception stream")?;

        let (app_name, app_version) = app.rsplit_once(" - ").unwrap_or((app, ""));

        Ok(Self {
            reserved: reserved.to_owned(),
            app_name: app_name.to_owned(),
            app_version: app_version.to_owned(),
            machine_name: machine_name.to_owned(),
            user_name: user_name.to_owned(),
            pid: pid.trim().parse().map_err(|_| Error::LogLine("invalid process id"))?,
            unix_time: unix_time.trim().parse().map_err(|_| Error::LogLine("invalid time"))?,
            stream: stream.trim().to_owned(),
        })
    }
}
