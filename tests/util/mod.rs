#![allow(dead_code)]

use std::{
    fs,
    io::Error,
    path::PathBuf,
    process::{Command, Output},
};

use tempfile::TempDir;

/// FROM/WHERE clause files in a scratch directory, removed with it.
pub struct ClauseFiles {
    _dir: TempDir,
    pub from_path: PathBuf,
    pub where_path: PathBuf,
}

impl ClauseFiles {
    pub fn new(from: &str, where_text: &str) -> Result<Self, Error> {
        let dir = TempDir::new()?;

        let from_path = dir.path().join("sqlFrom.txt");
        let where_path = dir.path().join("sqlWhere.txt");
        fs::write(&from_path, from)?;
        fs::write(&where_path, where_text)?;

        Ok(Self {
            _dir: dir,
            from_path,
            where_path,
        })
    }
}

/// Run the binary with `args`, capturing stdout and stderr.
pub fn sqlrewrite_run(args: &[&str]) -> Result<Output, Error> {
    Command::new(env!("CARGO_BIN_EXE_sqlrewrite"))
        .args(args)
        .output()
}

pub fn stdout_line(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim_end().to_owned()
}

pub const REPORT_FROM: &str = "large_table, small_table, mid_table";

pub const REPORT_WHERE: &str = "large_table.small_ref_id = small_table.id \
    AND large_table.mid_ref_id = mid_table.id \
    AND small_table.group_name = 'MyGroup' \
    AND ((large_table.date_time1 BETWEEN {d '2010-01-01'} AND {d '2017-01-01'} AND mid_table.type = 'Type1') \
      OR large_table.id IN (SELECT large_table.id FROM other_table \
           WHERE large_table.small_ref_id = small_table.id \
           AND large_table.mid_ref_id = mid_table.id \
           AND small_table.group_name = 'MyGroup' \
           AND large_table.date_time2 BETWEEN {d '2010-06-01'} AND {d '2017-01-01'} \
           AND mid_table.type = 'Type2') \
      OR (mid_table.date_time3 BETWEEN {d '2010-08-01'} AND {d '2017-01-01'} AND mid_table.type = 'Type3'))";

pub const REPORT_EXPECTED: &str = "((large_table.small_ref_id = small_table.id) AND (large_table.mid_ref_id = mid_table.id) AND (small_table.group_name = 'MyGroup') AND (((large_table.date_time1 BETWEEN '2010-01-01' AND '2017-01-01') AND (mid_table.type = 'Type1')) OR (large_table.id IN (select large_table.id from other_table where ((large_table.date_time2 BETWEEN '2010-06-01' AND '2017-01-01') AND (mid_table.type = 'Type2')))) OR ((mid_table.date_time3 BETWEEN '2010-08-01' AND '2017-01-01') AND (mid_table.type = 'Type3'))))";
