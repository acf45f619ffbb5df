//! Deterministic starter content for `create_file` when no content is given.

/// Keyword templates, matched in order against the lowercased file name.
const KEYWORD_TEMPLATES: &[(&str, &str)] = &[
    ("downloader", DOWNLOADER),
    ("scraper", SCRAPER),
    ("calculator", CALCULATOR),
    ("hello", HELLO),
    ("api", API_CLIENT),
    ("server", HTTP_SERVER),
];

/// Pick starter content for `name`.
pub fn template_for(name: &str) -> String {
    let lowered = name.to_lowercase();
    if let Some((_, body)) = KEYWORD_TEMPLATES.iter().find(|(key, _)| lowered.contains(key)) {
        return (*body).to_string();
    }

    let basename = name.rsplit(['/', '\\']).next().unwrap_or(name);
    if lowered.ends_with(".py") {
        return format!(
            "#!/usr/bin/env python3\n# {basename}\n\n\ndef main():\n    print(\"Hello from {basename}!\")\n\n\nif __name__ == \"__main__\":\n    main()\n"
        );
    }
    format!("# {}\n", title_case(basename))
}

/// Model output sometimes puts a JSON object where file content belongs.
pub fn looks_like_json_object(content: &str) -> bool {
    let trimmed = content.trim();
    trimmed.starts_with("{\"") && trimmed.ends_with('}')
}

fn title_case(name: &str) -> String {
    name.split(['_', '-', ' '])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

const HELLO: &str = r#"print("Hello, World!")
print("Welcome to Python programming!")
"#;

const DOWNLOADER: &str = r#"import os
from urllib.parse import urlparse

import requests


def download_file(url, folder="downloads"):
    """Download url into folder and return the saved path."""
    os.makedirs(folder, exist_ok=True)
    try:
        response = requests.get(url, stream=True, timeout=30)
        response.raise_for_status()
    except requests.RequestException as exc:
        print(f"Error downloading {url}: {exc}")
        return None

    filename = os.path.basename(urlparse(url).path) or "downloaded_file"
    target = os.path.join(folder, filename)
    with open(target, "wb") as handle:
        for chunk in response.iter_content(chunk_size=8192):
            handle.write(chunk)
    print(f"Downloaded {target} ({os.path.getsize(target)} bytes)")
    return target


def download_many(urls, folder="downloads"):
    return [path for path in (download_file(u, folder) for u in urls) if path]


if __name__ == "__main__":
    url = input("URL to download: ").strip()
    if url:
        download_file(url)
"#;

const SCRAPER: &str = r#"import csv

import requests
from bs4 import BeautifulSoup

HEADERS = {"User-Agent": "Mozilla/5.0"}


def scrape_page(url):
    """Collect title, headings and links from a page."""
    try:
        response = requests.get(url, headers=HEADERS, timeout=10)
        response.raise_for_status()
    except requests.RequestException as exc:
        return {"url": url, "error": str(exc)}

    soup = BeautifulSoup(response.content, "html.parser")
    return {
        "url": url,
        "title": soup.title.text.strip() if soup.title else "",
        "headings": [h.text.strip() for h in soup.find_all(["h1", "h2", "h3"])[:10]],
        "links": [a["href"] for a in soup.find_all("a", href=True)[:20]],
    }


def save_to_csv(rows, filename="scraped.csv"):
    if not rows:
        return
    with open(filename, "w", newline="", encoding="utf-8") as handle:
        writer = csv.DictWriter(handle, fieldnames=rows[0].keys())
        writer.writeheader()
        writer.writerows(rows)


if __name__ == "__main__":
    print(scrape_page(input("URL to scrape: ").strip()))
"#;

const CALCULATOR: &str = r#"import ast
import operator

OPERATORS = {
    ast.Add: operator.add,
    ast.Sub: operator.sub,
    ast.Mult: operator.mul,
    ast.Div: operator.truediv,
    ast.Pow: operator.pow,
    ast.USub: operator.neg,
}


def evaluate(expression):
    """Evaluate an arithmetic expression without eval()."""

    def walk(node):
        if isinstance(node, ast.Constant) and isinstance(node.value, (int, float)):
            return node.value
        if isinstance(node, ast.BinOp) and type(node.op) in OPERATORS:
            return OPERATORS[type(node.op)](walk(node.left), walk(node.right))
        if isinstance(node, ast.UnaryOp) and type(node.op) in OPERATORS:
            return OPERATORS[type(node.op)](walk(node.operand))
        raise ValueError("unsupported expression")

    return walk(ast.parse(expression, mode="eval").body)


if __name__ == "__main__":
    while True:
        expr = input("> ").strip()
        if expr.lower() in ("quit", "exit", "q"):
            break
        try:
            print(evaluate(expr))
        except (ValueError, SyntaxError, ZeroDivisionError) as exc:
            print(f"Error: {exc}")
"#;

const API_CLIENT: &str = r#"import json
from datetime import datetime

import requests


def call_api(url, method="GET", params=None, payload=None):
    """Make a JSON API request and wrap the outcome."""
    try:
        response = requests.request(method, url, params=params, json=payload, timeout=10)
        response.raise_for_status()
        data = response.json() if response.content else {}
        return {"ok": True, "status": response.status_code, "data": data}
    except (requests.RequestException, ValueError) as exc:
        return {"ok": False, "error": str(exc), "at": datetime.now().isoformat()}


if __name__ == "__main__":
    url = input("API URL: ").strip() or "https://httpbin.org/json"
    print(json.dumps(call_api(url), indent=2))
"#;

const HTTP_SERVER: &str = r#"import json
from http.server import BaseHTTPRequestHandler, HTTPServer


class Handler(BaseHTTPRequestHandler):
    def _send_json(self, payload, status=200):
        body = json.dumps(payload).encode()
        self.send_response(status)
        self.send_header("Content-Type", "application/json")
        self.send_header("Content-Length", str(len(body)))
        self.end_headers()
        self.wfile.write(body)

    def do_GET(self):
        if self.path == "/api/status":
            self._send_json({"status": "running"})
        else:
            self._send_json({"error": "not found"}, status=404)

    def do_POST(self):
        length = int(self.headers.get("Content-Length", 0))
        raw = self.rfile.read(length).decode("utf-8")
        try:
            self._send_json({"received": json.loads(raw or "{}")})
        except json.JSONDecodeError:
            self._send_json({"error": "invalid JSON"}, status=400)


def serve(port=8000):
    server = HTTPServer(("localhost", port), Handler)
    print(f"Serving on http://localhost:{port}")
    try:
        server.serve_forever()
    except KeyboardInterrupt:
        server.server_close()


if __name__ == "__main__":
    serve()
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_templates_match_substrings() {
        assert_eq!(template_for("file_downloader.py"), DOWNLOADER);
        assert_eq!(template_for("web_scraper.py"), SCRAPER);
        assert_eq!(template_for("Calculator.py"), CALCULATOR);
        assert_eq!(template_for("http_server.py"), HTTP_SERVER);
        assert_eq!(template_for("api_client.py"), API_CLIENT);
        assert_eq!(template_for("hello.py"), HELLO);
    }

    #[test]
    fn generic_python_template_names_the_file() {
        let body = template_for("x.py");
        assert!(body.starts_with("#!/usr/bin/env python3\n# x.py\n"));
        assert!(body.contains("print(\"Hello from x.py!\")"));
        assert_eq!(body, template_for("x.py"));
    }

    #[test]
    fn other_files_get_title_stub() {
        assert_eq!(template_for("release_notes.md"), "# Release Notes.md\n");
        assert_eq!(template_for("docs/todo-list"), "# Todo List\n");
    }

    #[test]
    fn json_object_detection() {
        assert!(looks_like_json_object(r#"{"tool": "create_file"}"#));
        assert!(looks_like_json_object("  {\"a\": 1}\n"));
        assert!(!looks_like_json_object("print('{}')"));
        assert!(!looks_like_json_object("{not json}"));
    }
}
