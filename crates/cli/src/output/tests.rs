use super::*;

fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
	let mut out = Vec::new();
	f(&mut out).unwrap();
	String::from_utf8(out).unwrap()
}

#[test]
fn test_port_line_format() {
	let text = render(|out| write_port(out, &PortInfo { index: 3, kind: 5 }));
	assert_eq!(text, "port 0x03: type 0005\n");
}

#[test]
fn test_grid_rows_of_sixteen() {
	let cells = (0..32u8).map(|i| if i == 0x12 { Some(0xab) } else { None });
	let text = render(|out| write_grid(out, cells));

	let lines: Vec<&str> = text.lines().collect();
	assert_eq!(lines.len(), 2);
	assert!(lines[0].starts_with("00: -- --"));
	assert_eq!(lines[0].split(' ').count(), ROW + 1);
	assert_eq!(lines[1], "10: -- -- ab -- -- -- -- -- -- -- -- -- -- -- -- --");
}

#[test]
fn test_register_prefix() {
	assert_eq!(render(|out| write_register(out, 0x50, 0x0a)), "50[0a]: ");
}
