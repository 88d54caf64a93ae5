//! Reading and writing body lists.
//!
//! The format is plain text: the number of bodies, followed by one line per body
//! holding `index x y mass vx vy`. Written files use 10 decimal places.

use std::{
    fmt::Display,
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::Path,
    str::FromStr,
};

use crate::{body::Body, Error, Vec2};

pub fn read_bodies(path: impl AsRef<Path>) -> Result<Vec<Body>, Error> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| Error::OpenInput {
        path: path.to_owned(),
        source,
    })?;

    parse_bodies(&text)
}

pub fn parse_bodies(text: &str) -> Result<Vec<Body>, Error> {
    let end = text.lines().count().max(1);
    let mut tokens = text
        .lines()
        .enumerate()
        .flat_map(|(i, line)| line.split_whitespace().map(move |token| (i + 1, token)));

    let count: usize = next_value(&mut tokens, "body count", end)?;
    // a body needs at least 12 bytes, a larger count fails below
    let mut bodies = Vec::with_capacity(count.min(text.len() / 12));
    for _ in 0..count {
        let index = next_value(&mut tokens, "index", end)?;
        let x = next_value(&mut tokens, "x", end)?;
        let y = next_value(&mut tokens, "y", end)?;
        let mass = next_value(&mut tokens, "mass", end)?;
        let vx = next_value(&mut tokens, "vx", end)?;
        let vy = next_value(&mut tokens, "vy", end)?;

        bodies.push(Body::new(index, Vec2::new(x, y), Vec2::new(vx, vy), mass));
    }

    Ok(bodies)
}

fn next_value<'a, T>(
    tokens: &mut impl Iterator<Item = (usize, &'a str)>,
    what: &str,
    end: usize,
) -> Result<T, Error>
where
    T: FromStr,
    T::Err: Display,
{
    let (line, token) = tokens.next().ok_or_else(|| Error::Parse {
        line: end,
        reason: format!("missing {what}"),
    })?;

    token.parse().map_err(|err| Error::Parse {
        line,
        reason: format!("invalid {what} {token:?}: {err}"),
    })
}

pub fn write_bodies(path: impl AsRef<Path>, bodies: &[Body]) -> Result<(), Error> {
    let path = path.as_ref();
    let to_error = |source| Error::WriteOutput {
        path: path.to_owned(),
        source,
    };

    let mut file = BufWriter::new(File::create(path).map_err(to_error)?);
    format_bodies(&mut file, bodies)
        .and_then(|()| file.flush())
        .map_err(to_error)
}

pub fn format_bodies(writer: &mut impl Write, bodies: &[Body]) -> Result<(), io::Error> {
    writeln!(writer, "{}", bodies.len())?;
    for body in bodies {
        writeln!(
            writer,
            "{} {:.10} {:.10} {:.10} {:.10} {:.10}",
            body.index,
            body.position.x,
            body.position.y,
            body.mass,
            body.velocity.x,
            body.velocity.y,
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse() {
        let text = "2\n0 1.5 2.5 10 0.1 -0.2\n1\t3 1 0.5 0 0\n";
        let bodies = parse_bodies(text).unwrap();

        assert_eq!(
            bodies,
            vec![
                Body::new(0, Vec2::new(1.5, 2.5), Vec2::new(0.1, -0.2), 10.),
                Body::new(1, Vec2::new(3., 1.), Vec2::new(0., 0.), 0.5),
            ]
        );
    }

    #[test]
    fn missing_values() {
        let err = parse_bodies("2\n0 1 1 1 0 0\n1 2 2\n").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 3, .. }), "{err}");

        let err = parse_bodies("").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 1, .. }), "{err}");
    }

    #[test]
    fn count_larger_than_body_list() {
        let err = parse_bodies("18446744073709551615\n").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 1, .. }), "{err}");

        let err = parse_bodies("3\n0 1 1 1 0 0\n1 2 2 1 0 0\n").unwrap_err();
        match err {
            Error::Parse { line, reason } => {
                assert_eq!(line, 3);
                assert_eq!(reason, "missing index");
            }
            err => panic!("unexpected error {err}"),
        }
    }

    #[test]
    fn invalid_values() {
        let err = parse_bodies("1\n0 1 one 1 0 0\n").unwrap_err();
        match err {
            Error::Parse { line, reason } => {
                assert_eq!(line, 2);
                assert!(reason.contains("invalid y"), "{reason}");
            }
            err => panic!("unexpected error {err}"),
        }
    }

    #[test]
    fn fixed_precision_output() {
        let mut bodies = vec![
            Body::new(0, Vec2::new(1., 2.5), Vec2::new(-0.125, 0.), 3.),
            Body::at_rest(1, Vec2::new(5., 1.), 1.),
        ];
        bodies[1].mark_lost();

        let mut out = Vec::new();
        format_bodies(&mut out, &bodies).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "2\n\
             0 1.0000000000 2.5000000000 3.0000000000 -0.1250000000 0.0000000000\n\
             1 5.0000000000 1.0000000000 -1.0000000000 0.0000000000 0.0000000000\n"
        );
    }

    #[test]
    fn files() {
        let path = std::env::temp_dir().join(format!("barnes_hut_io_{}.txt", std::process::id()));
        let bodies = vec![
            Body::new(0, Vec2::new(0.25, 3.75), Vec2::new(0.5, 0.), 2.),
            Body::new(1, Vec2::new(1.75, 0.5), Vec2::new(0., -0.5), 4.),
        ];

        write_bodies(&path, &bodies).unwrap();
        let read = read_bodies(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(read, bodies);
    }

    #[test]
    fn missing_input_file() {
        let err = read_bodies("/nonexistent/bodies.txt").unwrap_err();
        assert!(matches!(err, Error::OpenInput { .. }));
    }
}
