//! Server-rendered status page.

use crate::mint::StatusView;

/// Minimal HTML escaping for text and attribute values.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render(status: &StatusView, wallet_ids: &[String]) -> String {
    let mut body = String::new();
    body.push_str("<h2>Mint CIP-68 Token</h2>\n");
    body.push_str(&format!("<p>Network: {}</p>\n", escape(&status.network)));

    match &status.address {
        Some(address) => body.push_str(&format!(
            "<p>Connected Wallet: <strong>{}</strong></p>\n",
            escape(address)
        )),
        None => body.push_str("<p style=\"color: red\">&#10060; Wallet Not Connected</p>\n"),
    }

    body.push_str("<p>");
    for id in wallet_ids {
        let selected = status.wallet.as_deref() == Some(id.as_str());
        body.push_str(&format!(
            "<button onclick=\"selectWallet('{id}')\"{disabled}>{id}</button> ",
            id = escape(id),
            disabled = if selected { " disabled" } else { "" },
        ));
    }
    if status.wallet.is_some() {
        body.push_str("<button onclick=\"selectWallet(null)\">Disconnect</button>");
    }
    body.push_str("</p>\n");

    body.push_str(&format!(
        "<button id=\"mint\" onclick=\"mint()\"{}>{}</button>\n",
        if status.loading || !status.connected { " disabled" } else { "" },
        if status.loading { "Minting..." } else { "Mint Token" },
    ));

    if let (Some(tx_hash), Some(url)) = (&status.tx_hash, &status.explorer_url) {
        body.push_str(&format!(
            "<p>&#9989; Transaction Submitted! <a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">View on Cardanoscan</a> <code>{}</code></p>\n",
            escape(url),
            escape(tx_hash),
        ));
    }
    if let Some(error) = &status.error {
        body.push_str(&format!(
            "<p style=\"color: red\">&#10060; {}</p>\n",
            escape(error)
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>CIP-68 Minter</title>
<script>
async function post(path, body) {{
  await fetch(path, {{ method: "POST", headers: {{ "content-type": "application/json" }}, body: JSON.stringify(body) }});
  location.reload();
}}
function selectWallet(id) {{ post("/api/wallet", {{ wallet: id }}); }}
function mint() {{
  const button = document.getElementById("mint");
  button.disabled = true;
  button.textContent = "Minting...";
  post("/api/mint", {{}});
}}
</script>
</head>
<body>
{body}</body>
</html>
"#
    )
}
