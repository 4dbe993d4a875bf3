use std::{fs, path::PathBuf, str};

// Only used during testing so no need to return result
pub fn create_csv(headers: &[&str], rows: Vec<Vec<&str>>) -> String {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(headers).unwrap();
    for r in rows {
        wtr.write_record(r).unwrap();
    }
    wtr.flush().unwrap();
    String::from_utf8(wtr.into_inner().unwrap()).unwrap()
}

/// Writes `contents` to a fresh file under the system temp dir and returns its path.
pub fn write_fixture(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("split-ledger-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn split_rows(csv: &str) -> (String, Vec<String>) {
    let mut lines = csv.lines().filter(|line| !line.is_empty());
    let header = lines.next().unwrap_or_default().to_string();
    let mut rows: Vec<String> = lines.map(|line| line.to_string()).collect();
    rows.sort();
    (header, rows)
}

// Some outputs are order independent (e.g. members with equal balances). This compares rows as
// a multiset so those tests are not brittle
pub fn assert_unsorted_eq(s1: &str, s2: &str) {
    let (header1, rows1) = split_rows(s1);
    let (header2, rows2) = split_rows(s2);
    assert_eq!(header1, header2, "csv headers differ");
    if rows1.len() != rows2.len() {
        panic!("csvs do not contain the same number of rows");
    }
    assert_eq!(rows1, rows2);
}

#[cfg(test)]
mod tests {
    use crate::{assert_unsorted_eq, create_csv, split_rows};

    #[test]
    fn create_csv_creates_header_only() {
        let sut = create_csv(&["member_id", "amount"], vec![]);
        assert_eq!(sut, String::from("member_id,amount\n"));
    }

    #[test]
    fn create_csv_creates_multiple_rows() {
        let sut = create_csv(
            &["member_id", "amount"],
            vec![vec!["1", "10.00"], vec!["2", "5.00"]],
        );
        assert_eq!(sut, String::from("member_id,amount\n1,10.00\n2,5.00\n"));
    }

    #[test]
    fn rows_are_split_from_header() {
        let (header, rows) = split_rows("a,b\n2,x\n1,y\n");
        assert_eq!(header, "a,b");
        assert_eq!(rows, vec!["1,y", "2,x"]);
    }

    #[test]
    fn two_unsorted_csvs_will_assert_eq() {
        let csv1 = "a,b\n1,2\n2,2\n1,3\n";
        let csv2 = "a,b\n1,3\n2,2\n1,2\n";
        assert_unsorted_eq(csv1, csv2);
    }

    #[test]
    #[should_panic]
    fn two_unequal_len_csvs_will_assert_false() {
        assert_unsorted_eq("a,b\n1,2\n", "a,b\n1,2\n1,2\n");
    }

    #[test]
    #[should_panic]
    fn two_unequal_csvs_will_assert_false() {
        assert_unsorted_eq("a,b\n1,2\n2,3\n", "a,b\n1,2\n2,4\n");
    }

    #[test]
    #[should_panic]
    fn different_headers_will_assert_false() {
        assert_unsorted_eq("a,b\n1,2\n", "a,c\n1,2\n");
    }
}
